use cucumber::{cli, World};
use cucumber_tests::features;

#[tokio::main]
async fn main() {
    // Exécuter les scénarios Cucumber
    features::CairnWorld::cucumber()
        .with_cli::<()>(cli::Opts::parsed())
        .run_and_exit("features/")
        .await;
}
