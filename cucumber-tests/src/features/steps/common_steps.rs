//! Pas partagés: démarrage du serveur, fixtures sur disque et assertions
//! génériques sur la dernière réponse.

use cucumber::{given, then, when};
use std::fs;

use crate::features::world::CairnWorld;

#[given(expr = "un serveur Cairn démarré")]
async fn given_server_started(world: &mut CairnWorld) {
    world.start_server().expect("échec du démarrage du serveur");
    println!("🗿 Serveur Cairn démarré sur le port {}", world.port);
}

#[given(expr = "un serveur Cairn avec un budget keep-alive de {int} requêtes")]
async fn given_server_with_budget(world: &mut CairnWorld, budget: u32) {
    world
        .start_server_with(|config| {
            config.server.keep_alive_max = budget;
        })
        .expect("échec du démarrage du serveur");
    println!("🗿 Serveur démarré, budget keep-alive = {budget}");
}

#[given(expr = "un document {string} contenant {string}")]
async fn given_document(world: &mut CairnWorld, name: String, content: String) {
    fs::write(world.docroot_path().join(&name), &content).expect("écriture du document");
    println!("📄 Document {name} déposé dans la racine");
}

#[given(expr = "un répertoire {string} avec un fichier d'accueil contenant {string}")]
async fn given_directory_with_welcome(world: &mut CairnWorld, name: String, content: String) {
    let dir = world.docroot_path().join(&name);
    fs::create_dir_all(&dir).expect("création du répertoire");
    fs::write(dir.join("index.html"), &content).expect("écriture du fichier d'accueil");
    println!("📁 Répertoire {name}/ avec index.html");
}

#[when(expr = "je demande la page {string}")]
async fn when_request_page(world: &mut CairnWorld, path: String) {
    world.get(&path, &[]).await.expect("requête GET");
    println!("🌐 GET {path} → {}", world.response().status);
}

#[when(expr = "je demande la page {string} en acceptant {string}")]
async fn when_request_page_with_encoding(world: &mut CairnWorld, path: String, encoding: String) {
    world
        .get(&path, &[("Accept-Encoding", encoding.as_str())])
        .await
        .expect("requête GET");
    println!("🌐 GET {path} (Accept-Encoding: {encoding})");
}

#[then(expr = "le statut est {int}")]
async fn then_status(world: &mut CairnWorld, status: u16) {
    assert_eq!(world.response().status, status, "statut inattendu");
    println!("✅ Statut {status}");
}

#[then(expr = "le corps est {string}")]
async fn then_body_is(world: &mut CairnWorld, expected: String) {
    assert_eq!(world.response().body_text(), expected);
    println!("✅ Corps exact");
}

#[then(expr = "le corps contient {string}")]
async fn then_body_contains(world: &mut CairnWorld, excerpt: String) {
    let body = world.response().body_text();
    assert!(body.contains(&excerpt), "corps inattendu: {body:?}");
    println!("✅ Le corps contient {excerpt:?}");
}

#[then(expr = "l'entête {string} vaut {string}")]
async fn then_header_is(world: &mut CairnWorld, name: String, expected: String) {
    let value = world
        .response()
        .header(&name)
        .unwrap_or_else(|| panic!("entête {name} absent"));
    assert_eq!(value, expected);
    println!("✅ {name}: {expected}");
}

#[then(expr = "l'entête {string} est absent")]
async fn then_header_absent(world: &mut CairnWorld, name: String) {
    assert_eq!(world.response().header(&name), None, "entête {name} présent");
    println!("✅ Pas d'entête {name}");
}

#[then(expr = "le corps gzip décodé contient {string}")]
async fn then_gzip_body_contains(world: &mut CairnWorld, excerpt: String) {
    use std::io::Read as _;
    let mut decoded = String::new();
    flate2::read::GzDecoder::new(&world.response().body[..])
        .read_to_string(&mut decoded)
        .expect("corps gzip illisible");
    assert!(decoded.contains(&excerpt), "corps décodé inattendu: {decoded:?}");
    println!("✅ Corps gzip décodé");
}

#[then(expr = "le corps déclaré fait moins de {int} octets")]
async fn then_body_smaller_than(world: &mut CairnWorld, limit: usize) {
    let length = world.response().body.len();
    assert!(length < limit, "corps de {length} octets");
    let declared: usize = world
        .response()
        .header("Content-Length")
        .and_then(|v| v.parse().ok())
        .expect("Content-Length");
    assert_eq!(declared, length, "Content-Length ne reflète pas le corps encodé");
    println!("✅ {length} octets sur le fil");
}
