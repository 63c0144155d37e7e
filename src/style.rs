//! Page-wide styling hooks: the injected stylesheet and the reduced-quality
//! switch the governor flips.

use web_sys::Document;

use crate::error::{EffectsError, Result};

const STYLE_ID: &str = "pixel-fx-styles";

const INJECTED_CSS: &str = "
  @keyframes pulse-glow {
    0% { opacity: 0; transform: scale(0.8); }
    50% { opacity: 1; transform: scale(1.2); }
    100% { opacity: 0; transform: scale(1); }
  }

  .loaded .animate-in {
    opacity: 1 !important;
    transform: translateY(0) !important;
    transition: all 0.8s ease-out;
  }

  .low-performance * {
    animation-duration: 0.1s !important;
  }
";

/// The process-wide reduced-quality switch. Once on it stays on.
pub trait StyleFlag {
    fn enable_reduced_quality(&mut self);
    fn reduced_quality(&self) -> bool;
}

/// Toggles a class on `<body>`; the injected `.low-performance *` rule clamps
/// every animation duration.
pub struct BodyClassFlag {
    doc: Document,
    class: String,
    on: bool,
}

impl BodyClassFlag {
    pub fn new(doc: Document, class: impl Into<String>) -> Self {
        Self {
            doc,
            class: class.into(),
            on: false,
        }
    }
}

impl StyleFlag for BodyClassFlag {
    fn enable_reduced_quality(&mut self) {
        if self.on {
            return;
        }
        self.on = true;
        match self.doc.body() {
            Some(body) => {
                if let Err(e) = body.class_list().add_1(&self.class) {
                    log::error!("could not set {}: {:?}", self.class, e);
                }
            }
            None => log::error!("no <body> for {}", self.class),
        }
    }

    fn reduced_quality(&self) -> bool {
        self.on
    }
}

/// Add the effect stylesheet to `<head>` once.
pub fn inject_styles(doc: &Document) -> Result<()> {
    if doc.get_element_by_id(STYLE_ID).is_some() {
        return Ok(());
    }
    let head = doc.head().ok_or_else(|| EffectsError::MissingElement("head".into()))?;
    let style = doc.create_element("style")?;
    style.set_id(STYLE_ID);
    style.set_text_content(Some(INJECTED_CSS));
    head.append_child(&style)?;
    Ok(())
}

pub fn add_body_class(doc: &Document, class: &str) -> Result<()> {
    let body = doc.body().ok_or_else(|| EffectsError::MissingElement("body".into()))?;
    body.class_list().add_1(class)?;
    Ok(())
}
