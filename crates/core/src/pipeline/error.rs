use std::path::PathBuf;

use thiserror::Error;

use crate::detection::infrastructure::haar_cascade::CascadeError;

/// Everything that can stop a detection run.
///
/// `Startup` and `Configuration` happen before any image is touched and end
/// the program; the others are local to one run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to initialize: {0}")]
    Startup(String),

    #[error("failed to load cascade classifier: {0}")]
    Configuration(#[from] CascadeError),

    #[error("could not load image {path}: {reason}")]
    Input { path: PathBuf, reason: String },

    #[error("face detection failed: {0}")]
    Detection(String),

    #[error("could not draw bounding boxes: {0}")]
    Drawing(String),

    #[error("failed to save image to {path}: {reason}")]
    Output { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Startup(_) | Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::startup(PipelineError::Startup("logger".into()), true)]
    #[case::configuration(
        PipelineError::Configuration(CascadeError::NotFound(PathBuf::from("x.xml"))),
        true
    )]
    #[case::input(
        PipelineError::Input { path: PathBuf::from("in.jpg"), reason: "missing".into() },
        false
    )]
    #[case::detection(PipelineError::Detection("boom".into()), false)]
    #[case::drawing(PipelineError::Drawing("boom".into()), false)]
    #[case::output(
        PipelineError::Output { path: PathBuf::from("out.jpg"), reason: "denied".into() },
        false
    )]
    fn test_is_fatal(#[case] error: PipelineError, #[case] expected: bool) {
        assert_eq!(error.is_fatal(), expected);
    }

    #[test]
    fn test_cascade_error_converts_to_configuration() {
        let err: PipelineError = CascadeError::NotFound(PathBuf::from("faces.xml")).into();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.to_string().contains("faces.xml"));
    }

    #[test]
    fn test_messages_name_the_path() {
        let err = PipelineError::Output {
            path: PathBuf::from("/tmp/out.jpg"),
            reason: "permission denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to save image to /tmp/out.jpg: permission denied"
        );
    }
}
