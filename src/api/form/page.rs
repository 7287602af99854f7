// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTML rendering for the form front-ends

use ammonia::clean_text;

use crate::caption::is_failure;

pub const TITLE: &str = "🖼️ Captiongen - AI Image Caption Generator";
pub const DESCRIPTION: &str =
    "Upload an image to generate a descriptive caption using the BLIP model.";

/// Which form variant to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    /// Upload field only
    Upload,
    /// Upload field plus an image URL field
    UploadOrUrl,
}

impl FormKind {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Upload => "/caption",
            Self::UploadOrUrl => "/caption/url",
        }
    }
}

/// Render a form page, optionally with a caption (success or failure)
pub fn render_page(kind: FormKind, caption: Option<&str>, url: Option<&str>) -> String {
    let url_field = match kind {
        FormKind::Upload => String::new(),
        FormKind::UploadOrUrl => format!(
            r#"<label for="url">Or Enter Image URL</label>
      <input type="text" id="url" name="url" placeholder="https://..." value="{}">"#,
            clean_text(url.unwrap_or_default())
        ),
    };

    let other_link = match kind {
        FormKind::Upload => r#"<a href="/caption/url">Caption an image URL instead</a>"#,
        FormKind::UploadOrUrl => r#"<a href="/">Upload only</a>"#,
    };

    let output = match caption {
        Some(text) => {
            let class = if is_failure(text) { "caption error" } else { "caption" };
            format!(
                r#"<section>
      <label for="caption">Generated Caption</label>
      <output id="caption" class="{}">{}</output>
    </section>"#,
                class,
                clean_text(text)
            )
        }
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    body {{ font-family: sans-serif; max-width: 40rem; margin: 2rem auto; }}
    label {{ display: block; margin-top: 1rem; font-weight: bold; }}
    .caption {{ display: block; padding: .5rem; border: 1px solid #ccc; }}
    .error {{ color: #b00020; }}
  </style>
</head>
<body>
  <h1>{title}</h1>
  <p>{description}</p>
  <form action="{action}" method="post" enctype="multipart/form-data">
      <label for="image">Upload Image</label>
      <input type="file" id="image" name="image" accept="image/*">
      {url_field}
      <button type="submit">Generate Caption</button>
  </form>
  {output}
  <p>{other_link}</p>
</body>
</html>
"#,
        title = TITLE,
        description = DESCRIPTION,
        action = kind.action(),
        url_field = url_field,
        output = output,
        other_link = other_link,
    )
}
