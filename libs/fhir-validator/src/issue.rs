//! Validation issues and outcomes

use serde_json::Value;

/// Validation result for a single instance.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub type_name: String,
    pub valid: bool,
    /// Blocking violations, in schema walk order.
    pub issues: Vec<ValidationIssue>,
    /// Non-blocking notes (out-of-set codes under extensible/preferred
    /// bindings). Never affect `valid`.
    pub advisories: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    pub fn has_errors(&self) -> bool {
        !self.valid
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .count()
    }

    /// Render as a FHIR OperationOutcome JSON body, advisories included as
    /// informational entries.
    pub fn to_operation_outcome(&self) -> Value {
        let issues: Vec<Value> = self
            .issues
            .iter()
            .chain(self.advisories.iter())
            .map(ValidationIssue::to_json)
            .collect();

        serde_json::json!({
            "resourceType": "OperationOutcome",
            "issue": issues,
        })
    }
}

/// Individual validation issue.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: IssueCode,
    pub diagnostics: String,
    /// Field path relative to the resource root ("component[1].code").
    pub location: Option<String>,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, diagnostics: String) -> Self {
        Self {
            severity: IssueSeverity::Error,
            code,
            diagnostics,
            location: None,
        }
    }

    pub fn information(code: IssueCode, diagnostics: String) -> Self {
        Self {
            severity: IssueSeverity::Information,
            code,
            diagnostics,
            location: None,
        }
    }

    pub fn with_location(mut self, location: String) -> Self {
        self.location = Some(location);
        self
    }

    fn to_json(&self) -> Value {
        let mut issue = serde_json::json!({
            "severity": self.severity.to_string(),
            "code": self.code.to_string(),
            "diagnostics": self.diagnostics,
        });
        if let Some(ref location) = self.location {
            issue["location"] = serde_json::json!([location]);
        }
        issue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
    Information,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Information => write!(f, "information"),
        }
    }
}

/// OperationOutcome issue type, restricted to the codes this validator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    /// Structural problem: too many values, a choice group in an impossible
    /// state, a field the schema does not declare.
    Structure,
    /// A required field is absent.
    Required,
    /// A code is outside its required value set.
    CodeInvalid,
    /// The instance names a type the registry does not know.
    NotFound,
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Structure => "structure",
            Self::Required => "required",
            Self::CodeInvalid => "code-invalid",
            Self::NotFound => "not-found",
        };
        write!(f, "{s}")
    }
}
