//! Pas des formulaires: corps urlencodé et envois multipart.

use cucumber::when;

use crate::features::world::CairnWorld;

#[when(expr = "j'envoie le formulaire {string} vers {string}")]
async fn when_post_form(world: &mut CairnWorld, form: String, path: String) {
    world
        .post(&path, "application/x-www-form-urlencoded", form.into_bytes())
        .await
        .expect("POST urlencodé");
    println!("📮 Formulaire envoyé vers {path}");
}

#[when(expr = "j'envoie un fichier {string} contenant {string} vers {string}")]
async fn when_post_file(world: &mut CairnWorld, filename: String, content: String, path: String) {
    let boundary = "----cairn-bdd-2918";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"etiquette\"\r\n\r\n\
         granit\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"fichier\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    );
    world
        .post(
            &path,
            &format!("multipart/form-data; boundary={boundary}"),
            body.into_bytes(),
        )
        .await
        .expect("POST multipart");
    println!("📎 Fichier {filename} envoyé vers {path}");
}
