#![allow(dead_code)]
//! Monde partagé par tous les scénarios: un serveur Cairn en processus,
//! un client HTTP et la dernière réponse observée.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cairn_core::config::{AppConfig, CairnConfig, MappingConfig, VhostConfig};
use cairn_core::handler::FnHandler;
use cairn_core::session::{MemorySessionStore, Session, DEFAULT_SESSION_TTL};
use cairn_core::CairnServer;
use cucumber::World as CucumberWorld;
use tempfile::TempDir;

/// Une réponse HTTP telle que vue par le scénario, quel que soit le
/// client (reqwest ou TCP brut) qui l'a lue.
#[derive(Debug, Clone)]
pub struct StoredResponse {
    pub status: u16,
    /// Noms d'entêtes en minuscules, première occurrence seulement.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl StoredResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, CucumberWorld)]
#[world(init = Self::new)]
pub struct CairnWorld {
    pub port: u16,
    pub docroot: Option<TempDir>,
    pub client: reqwest::Client,
    pub last_response: Option<StoredResponse>,
    /// Réponses successives d'une rafale keep-alive.
    pub exchanges: Vec<StoredResponse>,
    /// Vrai si le serveur a fermé la connexion après la rafale.
    pub connection_closed: bool,
    pub session_cookie: Option<String>,
}

impl CairnWorld {
    pub fn new() -> Self {
        Self {
            port: 0,
            docroot: None,
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .timeout(Duration::from_secs(10))
                .build()
                .expect("client reqwest"),
            last_response: None,
            exchanges: Vec::new(),
            connection_closed: false,
            session_cookie: None,
        }
    }

    /// Démarre un serveur complet sur un port éphémère: l'application
    /// racine "site" plus "alpha" (vhost a.test) et "beta" (contexte /b).
    pub fn start_server(&mut self) -> anyhow::Result<()> {
        self.start_server_with(|_| {})
    }

    pub fn start_server_with(
        &mut self,
        configure: impl FnOnce(&mut CairnConfig),
    ) -> anyhow::Result<()> {
        let docroot = tempfile::tempdir()?;

        let mut config = CairnConfig::default();
        config.server.port = 0;
        config.deploy.applications.push(app(
            "alpha",
            None,
            Some(("a.test", vec!["www.a.test"])),
            "/var/www/alpha",
        ));
        config.deploy.applications.push(app("beta", Some("/b"), None, "/var/www/beta"));
        configure(&mut config);

        let store = Arc::new(MemorySessionStore::new());
        let sessions = Arc::clone(&store);

        let bound = CairnServer::new(config)
            .with_application(AppConfig {
                name: "site".to_string(),
                webapp_path: docroot.path().display().to_string(),
                context: Some("/".to_string()),
                vhosts: Vec::new(),
                servlet_mappings: vec![
                    mapping("/hello", "hello"),
                    mapping("/echo", "echo"),
                    mapping("/visites", "visits"),
                    mapping("/panne", "boom"),
                    mapping("/", "static"),
                    mapping("/docs*", "static"),
                    mapping("*", "whoami"),
                ],
                secured_urls: Vec::new(),
            })
            .with_session_store(store)
            .with_handler(
                "hello",
                Arc::new(FnHandler::new(|_req, resp| {
                    resp.text("bonjour");
                    Ok(())
                })),
            )
            .with_handler(
                "echo",
                Arc::new(FnHandler::new(|req, resp| {
                    let mut lines = Vec::new();
                    for (key, value) in req.params().iter() {
                        if let Some(text) = value.as_text() {
                            lines.push(format!("{key}={text}"));
                        }
                    }
                    for part in req.parts() {
                        lines.push(format!(
                            "fichier:{}:{}:{}",
                            part.name,
                            part.filename,
                            part.size()
                        ));
                    }
                    resp.text(lines.join("\n"));
                    Ok(())
                })),
            )
            .with_handler(
                "visits",
                Arc::new(FnHandler::new(move |req, resp| {
                    let mut session = Session::obtain(sessions.as_ref(), req);
                    let visits =
                        session.data.get("visites").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
                    session.data.insert("visites".to_string(), serde_json::json!(visits));
                    session.persist(sessions.as_ref(), resp, DEFAULT_SESSION_TTL);
                    resp.text(format!("visites={visits}"));
                    Ok(())
                })),
            )
            .with_handler(
                "boom",
                Arc::new(FnHandler::new(|_req, _resp| anyhow::bail!("panne simulée"))),
            )
            .with_handler(
                "whoami",
                Arc::new(FnHandler::new(|req, resp| {
                    resp.text(format!(
                        "app={} contexte={} chemin={}",
                        req.webapp_name().unwrap_or("?"),
                        req.context_path(),
                        req.relative_path()
                    ));
                    Ok(())
                })),
            )
            .bind()?;

        self.port = bound.local_addr().port();
        self.docroot = Some(docroot);
        thread::spawn(move || {
            let _ = bound.serve();
        });
        Ok(())
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn docroot_path(&self) -> &std::path::Path {
        self.docroot.as_ref().expect("serveur non démarré").path()
    }

    /// GET via reqwest; les entêtes additionnels au format (nom, valeur).
    pub async fn get(&mut self, path: &str, headers: &[(&str, &str)]) -> anyhow::Result<()> {
        let mut request = self.client.get(self.url(path));
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(cookie) = &self.session_cookie {
            request = request.header("Cookie", cookie.clone());
        }
        let response = request.send().await?;
        self.store_response(response).await
    }

    pub async fn post(
        &mut self,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.url(path))
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await?;
        self.store_response(response).await
    }

    async fn store_response(&mut self, response: reqwest::Response) -> anyhow::Result<()> {
        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_ascii_lowercase())
                .or_insert_with(|| value.to_str().unwrap_or_default().to_string());
        }
        let body = response.bytes().await?.to_vec();
        self.last_response = Some(StoredResponse { status, headers, body });
        Ok(())
    }

    /// Requête brute sur une connexion TCP dédiée, pour contrôler
    /// l'entête Host indépendamment de l'adresse de connexion.
    pub fn raw_get(&mut self, path: &str, host: &str) -> anyhow::Result<()> {
        let request = format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
        self.raw_request(&request)
    }

    /// Envoie des octets arbitraires et lit la réponse, pour les scénarios
    /// de protocole que reqwest refuserait de produire.
    pub fn raw_request(&mut self, request: &str) -> anyhow::Result<()> {
        let mut stream = self.connect()?;
        stream.write_all(request.as_bytes())?;
        self.last_response = Some(read_raw_response(&mut stream)?);
        Ok(())
    }

    /// Envoie `count` GET keep-alive séquentiels sur une même connexion et
    /// note si le serveur a fermé derrière.
    pub fn keep_alive_burst(&mut self, path: &str, count: usize) -> anyhow::Result<()> {
        let mut stream = self.connect()?;
        self.exchanges.clear();
        for _ in 0..count {
            let request = format!(
                "GET {path} HTTP/1.1\r\nHost: 127.0.0.1:{}\r\nConnection: keep-alive\r\n\r\n",
                self.port
            );
            stream.write_all(request.as_bytes())?;
            match read_raw_response(&mut stream) {
                Ok(response) => self.exchanges.push(response),
                Err(_) => break,
            }
        }
        // Une requête de plus: si le serveur a fermé, la lecture rend EOF.
        let probe = format!(
            "GET {path} HTTP/1.1\r\nHost: 127.0.0.1:{}\r\nConnection: keep-alive\r\n\r\n",
            self.port
        );
        let _ = stream.write_all(probe.as_bytes());
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
        self.connection_closed = rest.is_empty();
        Ok(())
    }

    fn connect(&self) -> anyhow::Result<TcpStream> {
        let stream = TcpStream::connect(("127.0.0.1", self.port))?;
        stream.set_read_timeout(Some(Duration::from_secs(10)))?;
        Ok(stream)
    }

    pub fn response(&self) -> &StoredResponse {
        self.last_response.as_ref().expect("aucune réponse enregistrée")
    }
}

fn app(
    name: &str,
    context: Option<&str>,
    vhost: Option<(&str, Vec<&str>)>,
    webapp_path: &str,
) -> AppConfig {
    AppConfig {
        name: name.to_string(),
        webapp_path: webapp_path.to_string(),
        context: context.map(String::from),
        vhosts: vhost
            .map(|(name, aliases)| {
                vec![VhostConfig {
                    name: name.to_string(),
                    aliases: aliases.into_iter().map(String::from).collect(),
                }]
            })
            .unwrap_or_default(),
        servlet_mappings: vec![mapping("*", "whoami")],
        secured_urls: Vec::new(),
    }
}

fn mapping(pattern: &str, handler: &str) -> MappingConfig {
    MappingConfig { url_pattern: pattern.to_string(), handler: handler.to_string() }
}

/// Lit une réponse complète: l'entame jusqu'à la ligne vide puis le corps
/// délimité par Content-Length.
fn read_raw_response(stream: &mut TcpStream) -> anyhow::Result<StoredResponse> {
    let mut raw = Vec::new();
    let mut byte = [0u8; 1];
    while !raw.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut byte)?;
        anyhow::ensure!(n > 0, "connexion fermée avant la fin de l'entame");
        raw.push(byte[0]);
    }
    let head = String::from_utf8(raw[..raw.len() - 4].to_vec())?;
    let status: u16 = head
        .split_whitespace()
        .nth(1)
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("ligne de statut illisible: {head:?}"))?;
    let mut headers = HashMap::new();
    for line in head.lines().skip(1) {
        if let Some((name, value)) = line.split_once(':') {
            headers
                .entry(name.trim().to_ascii_lowercase())
                .or_insert_with(|| value.trim().to_string());
        }
    }
    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    stream.read_exact(&mut body)?;
    Ok(StoredResponse { status, headers, body })
}
