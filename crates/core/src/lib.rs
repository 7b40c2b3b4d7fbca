//! Haar-cascade face detection for still images.
//!
//! Each context keeps its traits in `domain` and the file- or
//! algorithm-backed implementations in `infrastructure`; the `pipeline`
//! module wires them together.

/// Name and version reported when the engine starts.
pub const ENGINE_NAME: &str = env!("CARGO_PKG_NAME");
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod region;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod drawing {
    pub mod domain {
        pub mod box_renderer;
    }
    pub mod infrastructure;
}

pub mod imaging {
    pub mod domain {
        pub mod image_reader;
        pub mod image_writer;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod detection_pipeline;
    pub mod error;
    pub mod pipeline_logger;
}
