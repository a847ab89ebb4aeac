//! Pas des réponses d'erreur synthétisées par le moteur.

use cucumber::when;

use crate::features::world::CairnWorld;

#[when(expr = "j'envoie une ligne de requête invalide")]
async fn when_malformed_request_line(world: &mut CairnWorld) {
    world
        .raw_request("GET /trop de jetons HTTP/1.1\r\n\r\n")
        .expect("requête brute");
    println!("💥 Ligne de requête à cinq jetons envoyée");
}

#[when(expr = "j'envoie une requête HTTP\\/1.1 sans entête Host")]
async fn when_request_without_host(world: &mut CairnWorld) {
    world
        .raw_request("GET /hello HTTP/1.1\r\n\r\n")
        .expect("requête brute");
    println!("💥 Requête sans Host envoyée");
}
