//! Views - minimal HTML pages for the gallery.
//!
//! Pages are plain server-rendered HTML with a few lines of inline script
//! that call the JSON API. They sit behind the access gate.

use axum::{extract::State, response::Html};
use tracing::error;

use crate::media::MediaHost;
use crate::store::{ImageRecord, SessionStore};

use super::handlers::{AppState, DirectUploadConfig};
use super::session::CurrentSession;

/// Escape HTML special characters to prevent XSS attacks.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Cloud Gallery</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 960px; margin: 0 auto; padding: 24px; }}
        nav a {{ margin-right: 16px; }}
        form {{ display: flex; flex-direction: column; gap: 8px; max-width: 420px; }}
        .grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 16px; }}
        .card img {{ width: 100%; aspect-ratio: 1; object-fit: cover; }}
        .notice {{ color: #b00020; min-height: 1.2em; }}
    </style>
</head>
<body>
    <nav><a href="/">Home</a><a href="/gallery">Gallery</a><a href="/upload">Upload</a><a href="/login">Login</a><a href="/register">Register</a></nav>
    <h1>{title}</h1>
    {body}
    <p class="notice" id="notice"></p>
    <script>
        function notify(message) {{ document.getElementById('notice').textContent = message; }}
        async function failure(response, fallback) {{
            try {{ const body = await response.json(); return body.error || fallback; }} catch (_) {{ return fallback; }}
        }}
    </script>
</body>
</html>"##,
        title = html_escape(title),
        body = body,
    )
}

/// `GET /`
pub async fn index_view() -> Html<String> {
    Html(layout(
        "Cloud Gallery",
        r#"<p>Store your images and browse them in a private gallery.</p>
    <p><a href="/register">Create an account</a> or <a href="/login">log in</a>.</p>"#,
    ))
}

/// `GET /login`
pub async fn login_view() -> Html<String> {
    Html(layout(
        "Login",
        r#"<form id="login">
        <input name="email" type="email" placeholder="name@example.com" required>
        <input name="password" type="password" required>
        <button type="submit">Login</button>
    </form>
    <script>
        document.getElementById('login').addEventListener('submit', async (e) => {
            e.preventDefault();
            const form = new FormData(e.target);
            const response = await fetch('/api/auth/login', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ email: form.get('email'), password: form.get('password') }),
            });
            if (response.ok) { window.location = '/gallery'; }
            else { notify(await failure(response, 'Invalid email or password.')); }
        });
    </script>"#,
    ))
}

/// `GET /register`
pub async fn register_view() -> Html<String> {
    Html(layout(
        "Create an account",
        r#"<form id="register">
        <input name="email" type="email" placeholder="name@example.com" required>
        <input name="password" type="password" required>
        <input name="confirm_password" type="password" required>
        <button type="submit">Create account</button>
    </form>
    <script>
        document.getElementById('register').addEventListener('submit', async (e) => {
            e.preventDefault();
            const form = new FormData(e.target);
            if (form.get('password') !== form.get('confirm_password')) {
                notify('Passwords do not match'); return;
            }
            const response = await fetch('/api/auth/register', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(Object.fromEntries(form)),
            });
            if (!response.ok) { notify(await failure(response, 'Something went wrong. Please try again.')); return; }
            const body = await response.json();
            window.location = body.session_started ? '/gallery' : '/login';
        });
    </script>"#,
    ))
}

/// `GET /upload`
pub async fn upload_view<S, M>(State(state): State<AppState<S, M>>) -> Html<String>
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    Html(layout("Upload Image", &upload_body(&state.direct_upload)))
}

fn upload_body(config: &DirectUploadConfig) -> String {
    format!(
        r#"<form id="upload" data-upload-url="{upload_url}" data-api-key="{api_key}">
        <input name="title" placeholder="Enter image title" required>
        <textarea name="description" rows="3" placeholder="Enter image description"></textarea>
        <input name="file" type="file" accept="image/*" required>
        <button type="submit">Upload Image</button>
    </form>
    <script>
        document.getElementById('upload').addEventListener('submit', async (e) => {{
            e.preventDefault();
            const el = e.target;
            const form = new FormData(el);
            const file = form.get('file');
            if (!file || !file.size) {{ notify('Please select an image to upload.'); return; }}
            if (!file.type.startsWith('image/')) {{ notify('Please select an image file.'); return; }}
            try {{
                const sig = await fetch('/api/cloudinary/signature');
                if (!sig.ok) throw new Error(await failure(sig, 'Could not authorize upload'));
                const auth = await sig.json();
                const upload = new FormData();
                upload.append('file', file);
                upload.append('signature', auth.signature);
                upload.append('timestamp', auth.timestamp);
                upload.append('api_key', el.dataset.apiKey);
                for (const [k, v] of Object.entries(auth.params || {{}})) upload.append(k, v);
                const hosted = await (await fetch(el.dataset.uploadUrl, {{ method: 'POST', body: upload }})).json();
                if (hosted.error) throw new Error(hosted.error.message);
                const saved = await fetch('/api/images', {{
                    method: 'POST',
                    headers: {{ 'Content-Type': 'application/json' }},
                    body: JSON.stringify({{
                        title: form.get('title'),
                        description: form.get('description'),
                        image_url: hosted.secure_url,
                        cloudinary_public_id: hosted.public_id,
                    }}),
                }});
                if (!saved.ok) throw new Error(await failure(saved, 'Could not save image'));
                window.location = '/gallery';
            }} catch (err) {{
                notify(err.message || 'Something went wrong. Please try again.');
            }}
        }});
    </script>"#,
        upload_url = html_escape(&config.upload_url),
        api_key = html_escape(&config.api_key),
    )
}

/// `GET /gallery`
///
/// A failed listing renders an empty gallery; the cause is logged.
pub async fn gallery_view<S, M>(
    State(state): State<AppState<S, M>>,
    session: CurrentSession,
) -> Html<String>
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    let images = match state.store.list_images(&session.access_token).await {
        Ok(images) => images,
        Err(e) => {
            error!(user_id = %session.principal.id, error = %e, "Error fetching images");
            Vec::new()
        }
    };

    Html(layout("My Gallery", &gallery_body(&images)))
}

fn gallery_body(images: &[ImageRecord]) -> String {
    if images.is_empty() {
        return r#"<h2>No images found</h2>
    <p>You haven't uploaded any images yet.</p>
    <p><a href="/upload">Upload Your First Image</a></p>"#
            .to_string();
    }

    let cards: String = images
        .iter()
        .map(|image| {
            format!(
                r#"<div class="card" id="image-{id}">
            <a href="{url}" target="_blank" rel="noopener noreferrer"><img src="{url}" alt="{title}"></a>
            <h3>{title}</h3>
            <p>{description}</p>
            <small>{date}</small>
            <button data-id="{id}" data-public-id="{public_id}">Delete</button>
        </div>"#,
                id = html_escape(&image.id),
                url = html_escape(&image.image_url),
                title = html_escape(&image.title),
                description = html_escape(image.description.as_deref().unwrap_or("")),
                date = image.created_at.format("%Y-%m-%d"),
                public_id = html_escape(&image.cloudinary_public_id),
            )
        })
        .collect();

    format!(
        r#"<div class="grid">{cards}</div>
    <script>
        let deleting = false;
        document.querySelectorAll('button[data-id]').forEach((button) => {{
            button.addEventListener('click', async () => {{
                if (deleting) return;
                deleting = true;
                try {{
                    const remote = await fetch('/api/cloudinary/delete?publicId=' + encodeURIComponent(button.dataset.publicId), {{ method: 'DELETE' }});
                    if (!remote.ok && remote.status !== 404) throw new Error(await failure(remote, 'Could not delete image'));
                    const row = await fetch('/api/images/' + encodeURIComponent(button.dataset.id), {{ method: 'DELETE' }});
                    if (!row.ok && row.status !== 404) throw new Error(await failure(row, 'Could not delete image'));
                    document.getElementById('image-' + button.dataset.id).remove();
                    notify('The image has been deleted successfully.');
                }} catch (err) {{
                    notify(err.message || 'Something went wrong. Please try again.');
                }} finally {{
                    deleting = false;
                }}
            }});
        }});
    </script>"#
    )
}
