//! Suite BDD du serveur Cairn: le monde et les définitions de pas.

pub mod features;
