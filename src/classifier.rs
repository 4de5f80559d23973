use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PredictError, Result};
use crate::outcome::{Outcome, Prob3};
use crate::schema::FeatureSchema;

/// What the prediction service needs from a trained model. Implementations
/// are shared read-only across calls and threads.
pub trait Classifier: Send + Sync {
    fn schema(&self) -> &FeatureSchema;

    fn classify(&self, features: &[f64]) -> std::result::Result<Outcome, PredictError>;

    fn class_probabilities(&self, features: &[f64]) -> std::result::Result<Prob3, PredictError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelParams {
    Softmax {
        coefficients: [Vec<f64>; 3],
        intercepts: [f64; 3],
    },
    /// Tree ensemble; probabilities are the mean of per-tree leaf
    /// distributions.
    Forest { trees: Vec<DecisionTree> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Node 0 is the root; children always come after their parent.
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// `features[feature] <= threshold` goes left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { distribution: [f64; 3] },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    schema: FeatureSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    model: ModelParams,
}

impl ModelArtifact {
    pub fn new(schema: FeatureSchema, model: ModelParams) -> Result<Self> {
        let artifact = Self {
            fingerprint: Some(schema.fingerprint()),
            schema,
            model,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)?;
        artifact.validate()?;
        log::info!(
            "loaded {} model from {} ({} features)",
            artifact.kind(),
            path.display(),
            artifact.schema.width()
        );
        Ok(artifact)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn params(&self) -> &ModelParams {
        &self.model
    }

    pub fn kind(&self) -> &'static str {
        match self.model {
            ModelParams::Softmax { .. } => "softmax",
            ModelParams::Forest { .. } => "forest",
        }
    }

    /// Checks the stored fingerprint and that every parameter fits the schema
    /// width.
    pub fn validate(&self) -> Result<()> {
        if let Some(stored) = &self.fingerprint
            && *stored != self.schema.fingerprint()
        {
            return Err(PipelineError::schema_mismatch(
                "model fingerprint does not match its column list",
            ));
        }

        let width = self.schema.width();
        match &self.model {
            ModelParams::Softmax { coefficients, .. } => {
                for (class, row) in coefficients.iter().enumerate() {
                    if row.len() != width {
                        return Err(PipelineError::schema_mismatch(format!(
                            "class {class} has {} coefficients, schema has {width} columns",
                            row.len()
                        )));
                    }
                }
            }
            ModelParams::Forest { trees } => {
                if trees.is_empty() {
                    return Err(PipelineError::data_quality("forest has no trees"));
                }
                for (t, tree) in trees.iter().enumerate() {
                    tree.validate(width)
                        .map_err(|msg| PipelineError::schema_mismatch(format!("tree {t}: {msg}")))?;
                }
            }
        }
        Ok(())
    }

    fn check_width(&self, features: &[f64]) -> std::result::Result<(), PredictError> {
        if features.len() != self.schema.width() {
            return Err(PredictError::SchemaMismatch(format!(
                "got {} features, model expects {}",
                features.len(),
                self.schema.width()
            )));
        }
        Ok(())
    }
}

impl DecisionTree {
    fn validate(&self, width: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= width {
                    return Err(format!("node {idx} splits on feature {feature} of {width}"));
                }
                for child in [*left, *right] {
                    if child <= idx || child >= self.nodes.len() {
                        return Err(format!("node {idx} has invalid child {child}"));
                    }
                }
            }
        }
        Ok(())
    }

    /// `None` when the walk leaves the tree or reads past `features`.
    fn leaf_distribution(&self, features: &[f64]) -> Option<Prob3> {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx)? {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let next = if *features.get(*feature)? <= *threshold {
                        *left
                    } else {
                        *right
                    };
                    if next <= idx {
                        return None;
                    }
                    idx = next;
                }
                TreeNode::Leaf { distribution } => {
                    let total: f64 = distribution.iter().map(|d| d.max(0.0)).sum();
                    if total <= 0.0 {
                        return Some(Prob3::uniform());
                    }
                    return Some(Prob3 {
                        home: distribution[0].max(0.0) / total,
                        draw: distribution[1].max(0.0) / total,
                        away: distribution[2].max(0.0) / total,
                    });
                }
            }
        }
    }
}

fn softmax(logits: [f64; 3]) -> Prob3 {
    let mx = logits[0].max(logits[1].max(logits[2]));
    let e = logits.map(|l| (l - mx).exp());
    let den = (e[0] + e[1] + e[2]).max(1e-300);
    Prob3 {
        home: e[0] / den,
        draw: e[1] / den,
        away: e[2] / den,
    }
}

impl Classifier for ModelArtifact {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn classify(&self, features: &[f64]) -> std::result::Result<Outcome, PredictError> {
        Ok(self.class_probabilities(features)?.argmax())
    }

    fn class_probabilities(&self, features: &[f64]) -> std::result::Result<Prob3, PredictError> {
        self.check_width(features)?;
        if features.iter().any(|f| !f.is_finite()) {
            return Err(PredictError::Classifier("non-finite feature value".to_string()));
        }

        let p = match &self.model {
            ModelParams::Softmax {
                coefficients,
                intercepts,
            } => {
                let mut logits = *intercepts;
                for (k, row) in coefficients.iter().enumerate() {
                    logits[k] += row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>();
                }
                softmax(logits)
            }
            ModelParams::Forest { trees } => {
                let mut acc = [0.0_f64; 3];
                if trees.is_empty() {
                    return Err(PredictError::Classifier("forest has no trees".to_string()));
                }
                for (t, tree) in trees.iter().enumerate() {
                    let p = tree
                        .leaf_distribution(features)
                        .ok_or_else(|| PredictError::Classifier(format!("tree {t} is malformed")))?
                        .as_array();
                    for k in 0..3 {
                        acc[k] += p[k];
                    }
                }
                let n = trees.len() as f64;
                Prob3::from_array(acc.map(|a| a / n))
            }
        };
        Ok(p)
    }
}
