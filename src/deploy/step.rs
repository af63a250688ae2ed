/// One remote command with its label and failure policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub command: String,
    pub description: String,
    /// Stop the run when this step fails.
    pub abort_on_failure: bool,
    /// Printed when the step fails, after the captured stderr.
    pub failure_notice: Option<String>,
}

impl Step {
    /// A step whose failure is reported and then ignored.
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
            abort_on_failure: false,
            failure_notice: None,
        }
    }

    /// A step every later step depends on.
    pub fn gate(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            abort_on_failure: true,
            ..Self::new(command, description)
        }
    }

    pub fn with_failure_notice(mut self, notice: impl Into<String>) -> Self {
        self.failure_notice = Some(notice.into());
        self
    }
}
