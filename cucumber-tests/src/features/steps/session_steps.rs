//! Pas des sessions: continuité du cookie PHPSESSID entre requêtes.

use cucumber::{then, when};

use crate::features::world::CairnWorld;

#[when(expr = "je visite {string}")]
async fn when_visit(world: &mut CairnWorld, path: String) {
    world.get(&path, &[]).await.expect("requête GET");
    // Mémorise le cookie de session pour les visites suivantes.
    if let Some(set_cookie) = world.response().header("Set-Cookie") {
        let pair = set_cookie.split(';').next().unwrap_or_default().to_string();
        world.session_cookie = Some(pair);
    }
    println!("🚶 Visite de {path}");
}

#[then(expr = "le compteur de visites vaut {int}")]
async fn then_visit_count(world: &mut CairnWorld, count: u64) {
    assert_eq!(world.response().body_text(), format!("visites={count}"));
    println!("✅ {count} visite(s)");
}

#[then(expr = "un cookie de session PHPSESSID est émis")]
async fn then_session_cookie_issued(world: &mut CairnWorld) {
    let cookie = world.response().header("Set-Cookie").expect("Set-Cookie attendu");
    assert!(cookie.starts_with("PHPSESSID="), "cookie inattendu: {cookie}");
    assert!(cookie.contains("HttpOnly"));
    println!("🍪 Cookie de session émis");
}

#[then(expr = "aucun nouveau cookie n'est émis")]
async fn then_no_new_cookie(world: &mut CairnWorld) {
    assert_eq!(world.response().header("Set-Cookie"), None);
    println!("✅ Session déjà établie, pas de nouveau cookie");
}
