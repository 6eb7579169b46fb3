//! Request bodies that arrive either as JSON or as `multipart/form-data` with an image.

use std::io;
use std::path::Path;
use std::str::FromStr;

use ricette_blog::upload::{IMAGE_HEADER_LEN, check_image_size, detect_image, image_extension, image_path};
use ricette_blog::{Error, RecipeInput, StoryInput};
use salvo::http::form::{FilePart, FormData};
use salvo::http::mime;
use salvo::prelude::*;
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::config::Config;
use crate::error::ApiError;

const NOT_AN_INTEGER: &str = "Inserisci un numero intero valido.";
// Room for the other form fields and for images slightly over the limit, which then
// get the size message instead of a parse failure.
const FORM_OVERHEAD: u64 = 1024 * 1024;

/// `true`, `1`, `yes` and `on`, in any case, are true. Anything else is false.
pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn is_form(req: &Request) -> bool {
    req.content_type().is_some_and(|ct| {
        ct.type_() == mime::MULTIPART
            || (ct.type_() == mime::APPLICATION && ct.subtype() == mime::WWW_FORM_URLENCODED)
    })
}

async fn read_form<'a>(req: &'a mut Request, config: &Config) -> Result<&'a FormData, ApiError> {
    let limit = config
        .max_upload_bytes
        .saturating_mul(2)
        .saturating_add(FORM_OVERHEAD);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    Ok(req.form_data_max_size(limit).await?)
}

fn text(form: &FormData, name: &str) -> Option<String> {
    form.fields.get(name).cloned()
}

fn flag(form: &FormData, name: &str) -> Option<bool> {
    form.fields.get(name).map(|v| parse_bool(v))
}

fn number<T: FromStr>(form: &FormData, name: &'static str) -> Result<Option<T>, ApiError> {
    match form.fields.get(name).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| Error::validation(name, NOT_AN_INTEGER).into()),
    }
}

fn list(form: &FormData, name: &str) -> Option<Vec<String>> {
    form.fields
        .get_vec(name)
        .or_else(|| form.fields.get_vec(&format!("{name}[]")))
        .cloned()
}

fn image_part<'a>(form: &'a FormData) -> Option<&'a FilePart> {
    form.files
        .get("image")
        .filter(|file| file.size() > 0 || file.name().is_some_and(|n| !n.is_empty()))
}

async fn read_head(path: &Path) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(IMAGE_HEADER_LEN);
    fs::File::open(path)
        .await?
        .take(IMAGE_HEADER_LEN as u64)
        .read_to_end(&mut head)
        .await?;
    Ok(head)
}

/// Copies an uploaded image under `<media_root>/<dir>/` and returns its media-relative path.
/// Both the declared content type and the file contents must be an accepted image format.
async fn save_image(file: &FilePart, config: &Config, dir: &str) -> Result<String, ApiError> {
    check_image_size(file.size(), config.max_upload_bytes)?;
    let content_type = file
        .content_type()
        .map(|ct| ct.essence_str().to_owned())
        .unwrap_or_default();
    image_extension(&content_type)?;
    let extension = detect_image(&read_head(file.path()).await?)?;
    let relative = image_path(dir, extension);
    let target = config.media_root.join(&relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::copy(file.path(), &target).await?;
    tracing::info!(path = %relative, size = file.size(), "image stored");
    Ok(relative)
}

/// Removes an image stored by this request when the request fails afterwards.
pub(crate) async fn discard_image(config: &Config, image: Option<&str>) {
    let Some(image) = image else {
        return;
    };
    if let Err(e) = fs::remove_file(config.media_root.join(image)).await {
        tracing::warn!(error = %e, path = image, "failed to remove orphaned image");
    }
}

/// Reads a recipe submission.
pub(crate) async fn recipe_input(req: &mut Request, config: &Config) -> Result<RecipeInput, ApiError> {
    if !is_form(req) {
        return Ok(req.parse_json::<RecipeInput>().await?);
    }
    let form = read_form(req, config).await?;
    let mut input = RecipeInput {
        title: text(form, "title"),
        description: text(form, "description"),
        final_comment: text(form, "final_comment"),
        category: text(form, "category"),
        prep_time: number(form, "prep_time")?,
        gluten_free: flag(form, "gluten_free"),
        lactose_free: flag(form, "lactose_free"),
        is_sardinian: flag(form, "is_sardinian"),
        is_published: flag(form, "is_published"),
        ingredients: list(form, "ingredients"),
        instructions: list(form, "instructions"),
        image: None,
    };
    if let Some(file) = image_part(form) {
        input.image = Some(save_image(file, config, "recipes").await?);
    }
    Ok(input)
}

/// Reads a story submission.
pub(crate) async fn story_input(req: &mut Request, config: &Config) -> Result<StoryInput, ApiError> {
    if !is_form(req) {
        return Ok(req.parse_json::<StoryInput>().await?);
    }
    let form = read_form(req, config).await?;
    let mut input = StoryInput {
        title: text(form, "title"),
        content: text(form, "content"),
        role: text(form, "role"),
        is_published: flag(form, "is_published"),
        author_id: number(form, "author_id")?,
        image: None,
    };
    if let Some(file) = image_part(form) {
        input.image = Some(save_image(file, config, "stories").await?);
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use salvo::http::header::CONTENT_TYPE;
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::Value;

    use super::*;
    use crate::tests::{API, TestApp};

    const BOUNDARY: &str = "ricette-test-boundary";

    fn multipart(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((content_type, bytes)) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"foto\"\r\n\
                     Content-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    const FIELDS: [(&str, &str); 8] = [
        ("title", "Pane frattau"),
        ("description", "Pane carasau, sugo e uovo in camicia."),
        ("category", "Bread & Pizza"),
        ("prep_time", "25"),
        ("gluten_free", "no"),
        ("is_sardinian", "yes"),
        ("ingredients", "pane carasau"),
        ("ingredients", "uova"),
    ];

    #[tokio::test]
    async fn test_multipart_recipe_with_image() {
        let app = TestApp::new().await;
        let (_, token) = app.user("anna@example.com").await;
        let mut fields = FIELDS.to_vec();
        fields.push(("instructions", "Bagnare il pane nel brodo"));

        let mut res = TestClient::post(format!("{API}/recipes/"))
            .bearer_auth(&token)
            .add_header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"), true)
            .bytes(multipart(&fields, Some(("image/png", b"\x89PNG\r\n".as_slice()))))
            .send(&app.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::CREATED));
        let recipe: Value = res.take_json().await.unwrap();
        assert_eq!(recipe["is_sardinian"], true);
        assert_eq!(recipe["gluten_free"], false);
        assert_eq!(recipe["ingredients"][1]["name"], "uova");
        let image = recipe["image"].as_str().unwrap();
        assert!(image.starts_with("/media/recipes/") && image.ends_with(".png"));
        let stored = app
            .state
            .config
            .media_root
            .join(image.trim_start_matches("/media/"));
        assert!(stored.is_file());
    }

    #[tokio::test]
    async fn test_multipart_rejects_non_images_and_bad_numbers() {
        let app = TestApp::new().await;
        let (_, token) = app.user("anna@example.com").await;
        let send = |fields: Vec<(&'static str, &'static str)>, image: Option<(&'static str, &'static [u8])>| {
            TestClient::post(format!("{API}/recipes/"))
                .bearer_auth(&token)
                .add_header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"), true)
                .bytes(multipart(&fields, image))
        };

        let mut res = send(FIELDS.to_vec(), Some(("application/pdf", b"%PDF".as_slice())))
            .send(&app.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
        let body: Value = res.take_json().await.unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("Carica un'immagine valida."));

        let mut res = send(FIELDS.to_vec(), Some(("image/png", b"solo testo, niente pixel".as_slice())))
            .send(&app.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
        let body: Value = res.take_json().await.unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("Carica un'immagine valida."));

        let mut fields = FIELDS.to_vec();
        fields[3] = ("prep_time", "mezz'ora");
        let mut res = send(fields, None).send(&app.service).await;
        let body: Value = res.take_json().await.unwrap();
        assert_eq!(body["error"], NOT_AN_INTEGER);
    }

    #[test]
    fn test_parse_bool() {
        for value in ["true", "True", "1", "yes", " YES ", "on"] {
            assert!(parse_bool(value), "{value}");
        }
        for value in ["false", "0", "no", "", "si", "2"] {
            assert!(!parse_bool(value), "{value}");
        }
    }
}
