// Activation results
//
// Each extension activation is captured as its own outcome so one failing
// extension is recorded and reported without affecting the others.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationStatus {
    Succeeded,
    Failed(String),
}

/// Result of activating one extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationOutcome {
    pub path: String,
    pub status: ActivationStatus,
}

impl ActivationOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ActivationStatus::Succeeded
    }
}

/// Outcomes of one dispatch, in activation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub extension_point: String,
    pub outcomes: Vec<ActivationOutcome>,
}

impl ActivationReport {
    pub fn new(extension_point: &str) -> Self {
        Self {
            extension_point: extension_point.to_string(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, path: &str, result: anyhow::Result<()>) {
        let status = match result {
            Ok(()) => ActivationStatus::Succeeded,
            Err(e) => ActivationStatus::Failed(format!("{:#}", e)),
        };
        self.outcomes.push(ActivationOutcome {
            path: path.to_string(),
            status,
        });
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> Vec<&ActivationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect()
    }
}
