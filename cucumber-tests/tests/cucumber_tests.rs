use cucumber::World;
use cucumber_tests::features::CairnWorld;

#[tokio::main]
async fn main() {
    // Tous les scénarios protocole/routage/sessions du répertoire features/.
    CairnWorld::cucumber().run_and_exit("features/").await;
}
