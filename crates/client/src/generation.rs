//! Form values and the output panel of the generate flow.

use services::services::{catalog::Component, code_generation::GenerateCodeRequest};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationForm {
    pub component: Component,
    pub description: String,
    pub model: Option<String>,
}

impl GenerationForm {
    pub fn to_request(&self) -> GenerateCodeRequest {
        GenerateCodeRequest::new(self.component.name(), self.description.trim())
            .with_model(self.model.clone())
    }
}

/// What the output panel shows. At most one generation is outstanding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationPanel {
    pub busy: bool,
    pub code: Option<String>,
    pub error: Option<String>,
    pub advisory: Option<String>,
    pub pending_write: bool,
}

impl GenerationPanel {
    pub fn begin(&mut self) {
        self.busy = true;
        self.code = None;
        self.error = None;
        self.advisory = None;
    }

    pub fn succeed(&mut self, code: String) {
        self.busy = false;
        self.code = Some(code);
        self.error = None;
    }

    pub fn fail(&mut self, message: String) {
        self.busy = false;
        self.code = None;
        self.error = Some(message);
    }

    pub fn advise(&mut self, message: impl Into<String>) {
        self.advisory = Some(message.into());
    }
}
