//! Pas du routage à deux niveaux: hôtes virtuels puis motifs d'URL.

use cucumber::{then, when};

use crate::features::world::CairnWorld;

#[when(expr = "je demande {string} avec l'entête Host {string}")]
async fn when_request_with_host(world: &mut CairnWorld, path: String, host: String) {
    world.raw_get(&path, &host).expect("requête brute");
    println!("🌐 GET {path} (Host: {host})");
}

#[then(expr = "l'application {string} répond")]
async fn then_application_answers(world: &mut CairnWorld, name: String) {
    let body = world.response().body_text();
    assert!(
        body.contains(&format!("app={name} ")) || body.starts_with(&format!("app={name}")),
        "mauvaise application: {body:?}"
    );
    println!("✅ Application {name}");
}

#[then(expr = "le chemin relatif est {string}")]
async fn then_relative_path(world: &mut CairnWorld, path: String) {
    let body = world.response().body_text();
    assert!(
        body.ends_with(&format!("chemin={path}")),
        "chemin relatif inattendu: {body:?}"
    );
    println!("✅ Chemin relatif {path}");
}
