use std::fmt;

#[derive(Debug)]
pub enum BookPressError {
    // Malformed or incomplete content model; raised before any render.
    Validation(String),
    // The probe exposed no contents anchor, or page numbers never stabilized.
    LayoutResolution(String),
    Composition {
        stage: &'static str,
        source: Box<BookPressError>,
    },
    UnplaceableFlowable(String),
    InvalidConfiguration(String),
    Asset(String),
    Io(std::io::Error),
}

impl BookPressError {
    pub(crate) fn composition(stage: &'static str, source: BookPressError) -> Self {
        BookPressError::Composition {
            stage,
            source: Box::new(source),
        }
    }

    // Innermost cause, looking through composition wrappers.
    pub fn root_cause(&self) -> &BookPressError {
        match self {
            BookPressError::Composition { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl fmt::Display for BookPressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookPressError::Validation(message) => write!(f, "invalid book content: {}", message),
            BookPressError::LayoutResolution(message) => {
                write!(f, "page number resolution failed: {}", message)
            }
            BookPressError::Composition { stage, source } => {
                write!(f, "composition failed during {}: {}", stage, source)
            }
            BookPressError::UnplaceableFlowable(message) => {
                write!(f, "flowable cannot fit on any page: {}", message)
            }
            BookPressError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            BookPressError::Asset(message) => write!(f, "asset error: {}", message),
            BookPressError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for BookPressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BookPressError::Io(err) => Some(err),
            BookPressError::Composition { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BookPressError {
    fn from(value: std::io::Error) -> Self {
        BookPressError::Io(value)
    }
}

impl From<serde_json::Error> for BookPressError {
    fn from(value: serde_json::Error) -> Self {
        BookPressError::InvalidConfiguration(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn composition_keeps_cause_attached() {
        let err = BookPressError::composition(
            "probe",
            BookPressError::LayoutResolution("no anchors".to_string()),
        );
        assert!(err.to_string().contains("during probe"));
        assert!(err.to_string().contains("no anchors"));
        let source = err.source().expect("source");
        assert!(source.to_string().starts_with("page number resolution failed"));
        assert!(matches!(
            err.root_cause(),
            BookPressError::LayoutResolution(_)
        ));
    }

    #[test]
    fn io_errors_convert() {
        let err: BookPressError = std::io::Error::other("disk gone").into();
        assert!(matches!(err, BookPressError::Io(_)));
        assert!(err.source().is_some());
    }
}
