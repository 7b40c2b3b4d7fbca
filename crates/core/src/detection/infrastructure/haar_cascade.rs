//! Boosted Haar cascade model and its loader for OpenCV `opencv_storage`
//! XML files (the format `opencv_traincascade` writes, e.g.
//! `haarcascade_frontalface_default.xml`).

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::Node;
use thiserror::Error;

use super::integral_image::IntegralImage;

/// Stage thresholds are relaxed by this much on load so that windows sitting
/// exactly on the trained boundary still pass.
const STAGE_THRESHOLD_EPS: f32 = 1e-5;

const LEGACY_TYPE_ID: &str = "opencv-haar-classifier";

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("cascade classifier file not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read cascade file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed cascade XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("missing <{0}> element")]
    MissingElement(String),
    #[error("invalid value in <{element}>: {value:?}")]
    InvalidValue { element: String, value: String },
    #[error("unsupported cascade: {0}")]
    Unsupported(String),
    #[error("inconsistent cascade: {0}")]
    Inconsistent(String),
}

/// Weighted rectangle of a Haar feature, relative to the window origin.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HaarFeature {
    pub rects: Vec<WeightedRect>,
}

impl HaarFeature {
    /// Raw (unnormalised) response of the feature for the window at `(x, y)`.
    fn response(&self, integral: &IntegralImage, x: usize, y: usize) -> f64 {
        self.rects
            .iter()
            .map(|r| {
                let sum = integral.sum(
                    x + r.x as usize,
                    y + r.y as usize,
                    r.width as usize,
                    r.height as usize,
                );
                r.weight as f64 * sum as f64
            })
            .sum()
    }
}

/// Decision-tree node. Children `> 0` index another node; children `<= 0`
/// select leaf `-child`.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub left: i32,
    pub right: i32,
    pub feature: usize,
    pub threshold: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeakClassifier {
    pub nodes: Vec<TreeNode>,
    pub leaves: Vec<f32>,
}

impl WeakClassifier {
    fn evaluate(&self, feature_value: impl Fn(usize) -> f64) -> f64 {
        let mut idx = 0i32;
        loop {
            let node = &self.nodes[idx as usize];
            idx = if feature_value(node.feature) < node.threshold as f64 {
                node.left
            } else {
                node.right
            };
            if idx <= 0 {
                return self.leaves[(-idx) as usize] as f64;
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    /// Already relaxed by [`STAGE_THRESHOLD_EPS`].
    pub threshold: f32,
    pub classifiers: Vec<WeakClassifier>,
}

/// Outcome of running the cascade on one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowVerdict {
    Accepted,
    Rejected { stage: usize },
}

/// A validated boosted cascade of Haar-feature decision trees.
#[derive(Clone, Debug)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

impl HaarCascade {
    /// Loads a cascade from disk. A missing file is reported before any
    /// read is attempted.
    pub fn load(path: &Path) -> Result<Self, CascadeError> {
        if !path.exists() {
            return Err(CascadeError::NotFound(path.to_path_buf()));
        }
        let xml = fs::read_to_string(path).map_err(|source| CascadeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_xml_str(&xml)
    }

    pub fn from_xml_str(xml: &str) -> Result<Self, CascadeError> {
        let doc = roxmltree::Document::parse(xml)?;
        let cascade = doc
            .root_element()
            .children()
            .find(|n| n.is_element())
            .ok_or_else(|| CascadeError::MissingElement("cascade".into()))?;

        if cascade.attribute("type_id") == Some(LEGACY_TYPE_ID) {
            return Err(CascadeError::Unsupported(
                "legacy opencv-haar-classifier format; convert it with opencv_traincascade".into(),
            ));
        }

        let stage_type = child_text(cascade, "stageType")?;
        if stage_type != "BOOST" {
            return Err(CascadeError::Unsupported(format!(
                "stage type {stage_type}"
            )));
        }
        let feature_type = child_text(cascade, "featureType")?;
        if feature_type != "HAAR" {
            return Err(CascadeError::Unsupported(format!(
                "feature type {feature_type}"
            )));
        }

        let window_height: u32 = parse_value("height", child_text(cascade, "height")?)?;
        let window_width: u32 = parse_value("width", child_text(cascade, "width")?)?;

        let stages = items(child(cascade, "stages")?)
            .map(parse_stage)
            .collect::<Result<Vec<_>, _>>()?;
        let features = items(child(cascade, "features")?)
            .map(parse_feature)
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(window_width, window_height, stages, features)
    }

    /// Builds a cascade after checking every cross-reference: tree children,
    /// feature indices, and feature rectangles against the window.
    pub fn new(
        window_width: u32,
        window_height: u32,
        stages: Vec<Stage>,
        features: Vec<HaarFeature>,
    ) -> Result<Self, CascadeError> {
        if window_width == 0 || window_height == 0 {
            return Err(CascadeError::Inconsistent(format!(
                "window size {window_width}x{window_height}"
            )));
        }
        if stages.is_empty() {
            return Err(CascadeError::Inconsistent("no stages".into()));
        }

        for (fi, feature) in features.iter().enumerate() {
            if feature.rects.is_empty() || feature.rects.len() > 3 {
                return Err(CascadeError::Inconsistent(format!(
                    "feature {fi} has {} rectangles",
                    feature.rects.len()
                )));
            }
            for r in &feature.rects {
                let exceeds = |origin: u32, extent: u32, limit: u32| {
                    origin.checked_add(extent).map_or(true, |end| end > limit)
                };
                if exceeds(r.x, r.width, window_width) || exceeds(r.y, r.height, window_height) {
                    return Err(CascadeError::Inconsistent(format!(
                        "feature {fi} rectangle {}x{} at ({}, {}) exceeds the {window_width}x{window_height} window",
                        r.width, r.height, r.x, r.y
                    )));
                }
            }
        }

        for (si, stage) in stages.iter().enumerate() {
            if stage.classifiers.is_empty() {
                return Err(CascadeError::Inconsistent(format!(
                    "stage {si} has no weak classifiers"
                )));
            }
            for classifier in &stage.classifiers {
                validate_tree(classifier, features.len())
                    .map_err(|msg| CascadeError::Inconsistent(format!("stage {si}: {msg}")))?;
            }
        }

        Ok(Self {
            window_width,
            window_height,
            stages,
            features,
        })
    }

    /// Detection window `(width, height)` the cascade was trained on.
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn features(&self) -> &[HaarFeature] {
        &self.features
    }

    /// Runs every stage on the window whose top-left corner is `(x, y)`.
    ///
    /// The caller guarantees the window lies inside `integral`.
    pub fn classify(&self, integral: &IntegralImage, x: usize, y: usize) -> WindowVerdict {
        debug_assert!(
            x + self.window_width as usize <= integral.width()
                && y + self.window_height as usize <= integral.height(),
            "window at ({x}, {y}) exceeds the integral image"
        );
        let norm = self.variance_norm_factor(integral, x, y);
        for (index, stage) in self.stages.iter().enumerate() {
            let score: f64 = stage
                .classifiers
                .iter()
                .map(|c| c.evaluate(|f| self.features[f].response(integral, x, y) * norm))
                .sum();
            if score < stage.threshold as f64 {
                return WindowVerdict::Rejected { stage: index };
            }
        }
        WindowVerdict::Accepted
    }

    /// `1 / stddev`-style normaliser measured on the window inset by one
    /// pixel, so feature responses are contrast invariant.
    fn variance_norm_factor(&self, integral: &IntegralImage, x: usize, y: usize) -> f64 {
        let w = self.window_width.saturating_sub(2) as usize;
        let h = self.window_height.saturating_sub(2) as usize;
        let area = (w * h) as f64;
        let sum = integral.sum(x + 1, y + 1, w, h) as f64;
        let squared = integral.squared_sum(x + 1, y + 1, w, h) as f64;
        let nf = area * squared - sum * sum;
        if nf > 0.0 {
            1.0 / nf.sqrt()
        } else {
            1.0
        }
    }
}

fn validate_tree(classifier: &WeakClassifier, feature_count: usize) -> Result<(), String> {
    if classifier.nodes.is_empty() {
        return Err("weak classifier without nodes".into());
    }
    let node_count = classifier.nodes.len() as i32;
    let leaf_count = classifier.leaves.len() as i32;
    for (idx, node) in classifier.nodes.iter().enumerate() {
        if node.feature >= feature_count {
            return Err(format!(
                "feature index {} out of range ({feature_count} features)",
                node.feature
            ));
        }
        for child in [node.left, node.right] {
            if child > 0 {
                // Children must point forward so evaluation always terminates.
                if child <= idx as i32 || child >= node_count {
                    return Err(format!("node {idx} has invalid child {child}"));
                }
            } else if -child >= leaf_count {
                return Err(format!(
                    "node {idx} references leaf {} of {leaf_count}",
                    -child
                ));
            }
        }
    }
    Ok(())
}

fn parse_stage(node: Node) -> Result<Stage, CascadeError> {
    let threshold: f32 = parse_value("stageThreshold", child_text(node, "stageThreshold")?)?;
    let classifiers = items(child(node, "weakClassifiers")?)
        .map(parse_weak_classifier)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stage {
        threshold: threshold - STAGE_THRESHOLD_EPS,
        classifiers,
    })
}

fn parse_weak_classifier(node: Node) -> Result<WeakClassifier, CascadeError> {
    let raw_nodes = child_text(node, "internalNodes")?;
    let tokens: Vec<&str> = raw_nodes.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() % 4 != 0 {
        return Err(CascadeError::InvalidValue {
            element: "internalNodes".into(),
            value: raw_nodes.to_string(),
        });
    }
    let nodes = tokens
        .chunks_exact(4)
        .map(|t| -> Result<TreeNode, CascadeError> {
            Ok(TreeNode {
                left: parse_value("internalNodes", t[0])?,
                right: parse_value("internalNodes", t[1])?,
                feature: parse_value("internalNodes", t[2])?,
                threshold: parse_value("internalNodes", t[3])?,
            })
        })
        .collect::<Result<Vec<_>, CascadeError>>()?;

    let leaves = child_text(node, "leafValues")?
        .split_whitespace()
        .map(|t| parse_value("leafValues", t))
        .collect::<Result<Vec<f32>, _>>()?;

    Ok(WeakClassifier { nodes, leaves })
}

fn parse_feature(node: Node) -> Result<HaarFeature, CascadeError> {
    if let Some(tilted) = node.children().find(|n| n.has_tag_name("tilted")) {
        if tilted.text().map(str::trim) != Some("0") {
            return Err(CascadeError::Unsupported("tilted Haar features".into()));
        }
    }

    let rects = items(child(node, "rects")?)
        .map(|rect| -> Result<WeightedRect, CascadeError> {
            let raw = rect.text().unwrap_or("").trim();
            let tokens: Vec<&str> = raw.split_whitespace().collect();
            if tokens.len() != 5 {
                return Err(CascadeError::InvalidValue {
                    element: "rects".into(),
                    value: raw.to_string(),
                });
            }
            Ok(WeightedRect {
                x: parse_value("rects", tokens[0])?,
                y: parse_value("rects", tokens[1])?,
                width: parse_value("rects", tokens[2])?,
                height: parse_value("rects", tokens[3])?,
                weight: parse_value("rects", tokens[4])?,
            })
        })
        .collect::<Result<Vec<_>, CascadeError>>()?;

    Ok(HaarFeature { rects })
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>, CascadeError> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .ok_or_else(|| CascadeError::MissingElement(name.to_string()))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, CascadeError> {
    Ok(child(node, name)?.text().unwrap_or("").trim())
}

/// Element children of a sequence node (OpenCV writes them as `<_>`).
fn items<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn parse_value<T: FromStr>(element: &str, raw: &str) -> Result<T, CascadeError> {
    raw.trim().parse().map_err(|_| CascadeError::InvalidValue {
        element: element.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Single-stage, single-stump cascade over one feature.
    pub fn stump_cascade_xml(
        window: u32,
        feature_rect: &str,
        node_threshold: f32,
        leaves: (f32, f32),
        stage_threshold: f32,
    ) -> String {
        format!(
            r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>{window}</height>
  <width>{window}</width>
  <stageParams>
    <maxWeakCount>1</maxWeakCount></stageParams>
  <featureParams>
    <maxCatCount>0</maxCatCount></featureParams>
  <stageNum>1</stageNum>
  <stages>
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>{stage_threshold}</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 {node_threshold}</internalNodes>
          <leafValues>
            {} {}</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          {feature_rect}</_></rects></_></features></cascade>
</opencv_storage>
"#,
            leaves.0, leaves.1
        )
    }

    /// Cascade that accepts every window (leaves are both above threshold).
    pub fn accept_all_xml(window: u32) -> String {
        stump_cascade_xml(window, &format!("0 0 {window} {window} 1."), 0.0, (1.0, 1.0), 0.5)
    }

    /// Cascade that rejects every window at its first stage.
    pub fn reject_all_xml(window: u32) -> String {
        stump_cascade_xml(window, &format!("0 0 {window} {window} 1."), 0.0, (-1.0, -1.0), 0.5)
    }
}
