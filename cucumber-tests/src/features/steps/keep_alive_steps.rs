//! Pas du cycle de vie des connexions persistantes.

use cucumber::{then, when};

use crate::features::world::CairnWorld;

#[when(expr = "j'envoie {int} requêtes keep-alive successives vers {string}")]
async fn when_keep_alive_burst(world: &mut CairnWorld, count: usize, path: String) {
    world.keep_alive_burst(&path, count).expect("rafale keep-alive");
    println!("🔁 {count} requêtes envoyées sur une connexion");
}

#[then(expr = "je reçois {int} réponses")]
async fn then_response_count(world: &mut CairnWorld, count: usize) {
    assert_eq!(world.exchanges.len(), count, "nombre de réponses inattendu");
    assert!(world.exchanges.iter().all(|r| r.status == 200));
    println!("✅ {count} réponses reçues");
}

#[then(expr = "la dernière réponse annonce Keep-Alive max={int}")]
async fn then_last_keep_alive_max(world: &mut CairnWorld, max: u32) {
    let last = world.exchanges.last().expect("aucune réponse");
    let value = last.header("Keep-Alive").expect("entête Keep-Alive attendu");
    assert!(
        value.starts_with(&format!("max={max}, timeout=")),
        "Keep-Alive inattendu: {value}"
    );
    println!("✅ Keep-Alive: {value}");
}

#[then(expr = "les réponses précédentes restent keep-alive")]
async fn then_earlier_responses_keep_alive(world: &mut CairnWorld) {
    let exchanges = &world.exchanges;
    for response in &exchanges[..exchanges.len() - 1] {
        assert_eq!(response.header("Connection"), Some("keep-alive"));
    }
    println!("✅ Connexion maintenue jusqu'à l'épuisement du budget");
}

#[then(expr = "le serveur ferme la connexion")]
async fn then_connection_closed(world: &mut CairnWorld) {
    let last = world.exchanges.last().expect("aucune réponse");
    assert_eq!(last.header("Connection"), Some("close"));
    assert!(world.connection_closed, "la connexion est restée ouverte");
    println!("✅ Connexion fermée par le serveur");
}
