// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single-shot HTML form front-ends

pub mod handler;
pub mod page;

pub use handler::{
    upload_page_handler, upload_submit_handler, url_page_handler, url_submit_handler,
};
pub use page::{render_page, FormKind};
