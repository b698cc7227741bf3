//! Forest adapter: Implementation of RiskModel over an exported tree ensemble.
//!
//! The classifier is exported from the training pipeline as `model.json`: one
//! decision-tree ensemble per output slot. Prediction averages the class
//! distributions of the leaves reached in every tree and emits the class
//! with the highest mean probability (first one on ties).
//!
//! # Integrity
//!
//! The artifact directory must contain `manifest.json` binding `model.json`
//! to its SHA-256 digest (written by the `seal_model` binary). The digest is
//! checked before the model is parsed. Debug builds may skip the check with
//! `MEDIPREDICT_ALLOW_UNVERIFIED_MODELS=true`; release builds never do.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{FeatureVector, FEATURE_COUNT, LABEL_COUNT};
use crate::ports::{ModelError, RiskModel};

/// Environment variable to allow loading models without a manifest.
#[cfg(debug_assertions)]
const ALLOW_UNVERIFIED_MODELS_ENV: &str = "MEDIPREDICT_ALLOW_UNVERIFIED_MODELS";

/// Artifact file names inside the model directory.
pub const MODEL_FILE: &str = "model.json";
pub const MANIFEST_FILE: &str = "manifest.json";

const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// One node of an exported decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go to `left` when `features[feature] <= threshold`, else `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class distribution, aligned with the output's `classes`.
    Leaf { distribution: Vec<f64> },
}

/// Exported decision tree. Node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

/// Ensemble for one output slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestOutput {
    pub name: String,
    pub classes: Vec<i64>,
    pub trees: Vec<DecisionTree>,
}

/// Exported multi-output model, as written to `model.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedForest {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub outputs: Vec<ForestOutput>,
}

/// Integrity manifest, as written to `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    /// File name -> lowercase hex SHA-256
    pub files: BTreeMap<String, String>,
}

/// Lowercase hex SHA-256 of a byte slice.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn allow_unverified_models() -> bool {
    #[cfg(debug_assertions)]
    {
        std::env::var(ALLOW_UNVERIFIED_MODELS_ENV)
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
            .unwrap_or(false)
    }
    #[cfg(not(debug_assertions))]
    {
        false
    }
}

/// Tree-ensemble risk model.
#[derive(Debug, Clone)]
pub struct ForestModel {
    forest: ExportedForest,
    digest: String,
}

impl ForestModel {
    /// Load and verify the model in `model_dir`.
    ///
    /// `model_dir` may also point directly at `model.json`.
    ///
    /// # Errors
    /// Returns error if the files cannot be read, the digest does not match,
    /// or the artifact is structurally invalid.
    pub fn load(model_dir: &Path) -> Result<Self, ModelError> {
        let base_dir: PathBuf = if model_dir.is_file() {
            model_dir.parent().unwrap_or(model_dir).to_path_buf()
        } else {
            model_dir.to_path_buf()
        };
        let model_path = base_dir.join(MODEL_FILE);
        if !model_path.exists() {
            return Err(ModelError::NotLoaded(format!(
                "No {MODEL_FILE} found in {base_dir:?}"
            )));
        }

        let bytes = std::fs::read(&model_path)?;
        let digest = sha256_hex(&bytes);
        Self::verify_manifest(&base_dir, &digest)?;

        let forest: ExportedForest = serde_json::from_slice(&bytes)
            .map_err(|e| ModelError::InvalidArtifact(e.to_string()))?;
        let model = Self::from_export(forest, digest)?;

        tracing::info!(
            "Loaded risk model from {:?} (outputs={}, trees={}, sha256={})",
            model_path,
            model.forest.outputs.len(),
            model.forest.outputs.iter().map(|o| o.trees.len()).sum::<usize>(),
            &model.digest[..12]
        );
        Ok(model)
    }

    /// Build a model from an in-memory export, validating its structure.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidArtifact` if the export is malformed.
    pub fn from_export(forest: ExportedForest, digest: String) -> Result<Self, ModelError> {
        Self::validate(&forest)?;
        Ok(Self { forest, digest })
    }

    fn verify_manifest(base_dir: &Path, digest: &str) -> Result<(), ModelError> {
        let manifest_path = base_dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            if allow_unverified_models() {
                tracing::warn!(
                    "Loading model without {MANIFEST_FILE} (unverified models allowed in debug build)"
                );
                return Ok(());
            }
            return Err(ModelError::Integrity(format!(
                "{MANIFEST_FILE} missing in {base_dir:?}; run seal_model first"
            )));
        }

        let content = std::fs::read(&manifest_path)?;
        let manifest: ModelManifest = serde_json::from_slice(&content)
            .map_err(|e| ModelError::Integrity(format!("Invalid manifest: {e}")))?;
        if manifest.version != 1 {
            return Err(ModelError::Integrity(format!(
                "Unsupported manifest version {}",
                manifest.version
            )));
        }

        let expected = manifest.files.get(MODEL_FILE).ok_or_else(|| {
            ModelError::Integrity(format!("{MANIFEST_FILE} does not bind {MODEL_FILE}"))
        })?;
        if !expected.eq_ignore_ascii_case(digest) {
            tracing::error!("Model digest mismatch: manifest={expected}, actual={digest}");
            return Err(ModelError::Integrity(format!(
                "{MODEL_FILE} digest does not match manifest"
            )));
        }

        tracing::debug!("Model digest verified against manifest");
        Ok(())
    }

    fn validate(forest: &ExportedForest) -> Result<(), ModelError> {
        let invalid = |msg: String| Err(ModelError::InvalidArtifact(msg));

        if forest.format_version != SUPPORTED_FORMAT_VERSION {
            return invalid(format!(
                "format_version {} unsupported (expected {SUPPORTED_FORMAT_VERSION})",
                forest.format_version
            ));
        }
        if forest.feature_names.len() != FEATURE_COUNT {
            return invalid(format!(
                "expected {FEATURE_COUNT} features, artifact declares {}",
                forest.feature_names.len()
            ));
        }
        if forest.outputs.len() != LABEL_COUNT {
            return invalid(format!(
                "expected {LABEL_COUNT} outputs, artifact declares {}",
                forest.outputs.len()
            ));
        }

        for output in &forest.outputs {
            if output.classes.is_empty() {
                return invalid(format!("output {:?} has no classes", output.name));
            }
            if output.trees.is_empty() {
                return invalid(format!("output {:?} has no trees", output.name));
            }
            for (t, tree) in output.trees.iter().enumerate() {
                if tree.nodes.is_empty() {
                    return invalid(format!("output {:?} tree {t} is empty", output.name));
                }
                for (n, node) in tree.nodes.iter().enumerate() {
                    match node {
                        TreeNode::Split {
                            feature,
                            left,
                            right,
                            ..
                        } => {
                            if *feature >= FEATURE_COUNT {
                                return invalid(format!(
                                    "output {:?} tree {t} node {n}: feature {feature} out of range",
                                    output.name
                                ));
                            }
                            if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                                return invalid(format!(
                                    "output {:?} tree {t} node {n}: child index out of range",
                                    output.name
                                ));
                            }
                        }
                        TreeNode::Leaf { distribution } => {
                            if distribution.len() != output.classes.len() {
                                return invalid(format!(
                                    "output {:?} tree {t} node {n}: distribution has {} entries, expected {}",
                                    output.name,
                                    distribution.len(),
                                    output.classes.len()
                                ));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// SHA-256 of the loaded artifact.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    fn leaf<'a>(tree: &'a DecisionTree, x: &[f64]) -> Result<&'a [f64], ModelError> {
        let mut index = 0;
        // A valid tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..tree.nodes.len() {
            match &tree.nodes[index] {
                TreeNode::Leaf { distribution } => return Ok(distribution.as_slice()),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
        Err(ModelError::Traversal(
            "tree does not terminate (cycle in node links)".into(),
        ))
    }

    fn predict_output(output: &ForestOutput, x: &[f64]) -> Result<i64, ModelError> {
        // Summed distributions; argmax is the same as for the mean.
        let mut totals = vec![0.0; output.classes.len()];
        for tree in &output.trees {
            for (acc, p) in totals.iter_mut().zip(Self::leaf(tree, x)?) {
                *acc += p;
            }
        }

        let mut best = 0;
        for (i, p) in totals.iter().enumerate() {
            if *p > totals[best] {
                best = i;
            }
        }
        Ok(output.classes[best])
    }
}

impl RiskModel for ForestModel {
    fn predict(&self, features: &FeatureVector) -> Result<Vec<i64>, ModelError> {
        let x = features.as_slice();
        self.forest
            .outputs
            .iter()
            .map(|output| Self::predict_output(output, x))
            .collect()
    }

    fn describe(&self) -> String {
        format!("forest:{}", &self.digest[..12.min(self.digest.len())])
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{FeatureEncoder, FEATURE_NAMES};
    use tempfile::tempdir;

    fn leaf(distribution: [f64; 3]) -> TreeNode {
        TreeNode::Leaf {
            distribution: distribution.to_vec(),
        }
    }

    /// Three-way split on one feature: <= low -> class 0, <= high -> 1, else 2.
    fn banded(name: &str, feature: usize, low: f64, high: f64) -> ForestOutput {
        ForestOutput {
            name: name.into(),
            classes: vec![0, 1, 2],
            trees: vec![DecisionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature,
                        threshold: low,
                        left: 1,
                        right: 2,
                    },
                    leaf([1.0, 0.0, 0.0]),
                    TreeNode::Split {
                        feature,
                        threshold: high,
                        left: 3,
                        right: 4,
                    },
                    leaf([0.0, 1.0, 0.0]),
                    leaf([0.0, 0.0, 1.0]),
                ],
            }],
        }
    }

    pub(crate) fn sample_export() -> ExportedForest {
        ExportedForest {
            format_version: 1,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            outputs: vec![
                ForestOutput {
                    name: "reserved".into(),
                    classes: vec![0, 1, 2],
                    trees: vec![DecisionTree {
                        nodes: vec![leaf([1.0, 0.0, 0.0])],
                    }],
                },
                banded("crd", 6, 0.5, 1.5),
                banded("heart", 10, 129.5, 139.5),
                banded("diabetes", 5, 1.5, 4.5),
                banded("liver", 7, 0.5, 2.5),
            ],
        }
    }

    fn write_model(dir: &Path, export: &ExportedForest, seal: bool) -> Vec<u8> {
        let bytes = serde_json::to_vec(export).expect("serialize model");
        std::fs::write(dir.join(MODEL_FILE), &bytes).expect("write model");
        if seal {
            let manifest = ModelManifest {
                version: 1,
                files: BTreeMap::from([(MODEL_FILE.to_string(), sha256_hex(&bytes))]),
            };
            std::fs::write(
                dir.join(MANIFEST_FILE),
                serde_json::to_vec(&manifest).expect("serialize manifest"),
            )
            .expect("write manifest");
        }
        bytes
    }

    #[test]
    fn test_load_sealed_model_and_predict_scenario() {
        let temp = tempdir().expect("tempdir");
        let bytes = write_model(temp.path(), &sample_export(), true);

        let model = ForestModel::load(temp.path()).expect("load sealed model");
        assert_eq!(model.digest(), sha256_hex(&bytes));

        let input = crate::domain::fixtures::scenario_input();
        let features = FeatureEncoder::encode(&input).vector;
        assert_eq!(model.predict(&features).expect("predict"), vec![0, 2, 2, 2, 1]);
    }

    #[test]
    fn test_shipped_model_is_sealed() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("models");
        let model = ForestModel::load(&dir).expect("load shipped model");

        let features = FeatureEncoder::encode(&crate::domain::fixtures::scenario_input()).vector;
        assert_eq!(model.predict(&features).expect("predict"), vec![0, 2, 2, 2, 1]);
    }

    #[test]
    fn test_load_accepts_model_file_path() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &sample_export(), true);
        assert!(ForestModel::load(&temp.path().join(MODEL_FILE)).is_ok());
    }

    #[test]
    fn test_load_rejects_tampered_model() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &sample_export(), true);

        let mut tampered = sample_export();
        tampered.outputs[2] = banded("heart", 10, 200.0, 250.0);
        let bytes = serde_json::to_vec(&tampered).expect("serialize");
        std::fs::write(temp.path().join(MODEL_FILE), bytes).expect("overwrite model");

        let err = ForestModel::load(temp.path()).expect_err("must fail");
        assert!(matches!(err, ModelError::Integrity(_)));
    }

    #[test]
    fn test_load_rejects_missing_model() {
        let temp = tempdir().expect("tempdir");
        let err = ForestModel::load(temp.path()).expect_err("must fail");
        assert!(matches!(err, ModelError::NotLoaded(_)));
    }

    #[test]
    fn test_validate_feature_count() {
        let mut export = sample_export();
        export.feature_names.pop();
        let err = ForestModel::from_export(export, String::new()).expect_err("must fail");
        assert!(matches!(err, ModelError::InvalidArtifact(_)));
    }

    #[test]
    fn test_validate_output_count_and_links() {
        let mut export = sample_export();
        export.outputs.pop();
        assert!(ForestModel::from_export(export, String::new()).is_err());

        let mut export = sample_export();
        export.outputs[1].trees[0].nodes[0] = TreeNode::Split {
            feature: 6,
            threshold: 0.5,
            left: 1,
            right: 99,
        };
        assert!(ForestModel::from_export(export, String::new()).is_err());

        let mut export = sample_export();
        export.outputs[1].trees[0].nodes[1] = TreeNode::Leaf {
            distribution: vec![1.0],
        };
        assert!(ForestModel::from_export(export, String::new()).is_err());
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut export = sample_export();
        export.outputs[1].trees[0].nodes[2] = TreeNode::Split {
            feature: 6,
            threshold: 1.5,
            left: 0,
            right: 0,
        };
        let model = ForestModel::from_export(export, "0".repeat(64)).expect("structurally valid");
        let features = FeatureVector::from([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(matches!(
            model.predict(&features),
            Err(ModelError::Traversal(_))
        ));
    }

    #[test]
    fn test_ensemble_averages_and_breaks_ties_low() {
        let mut export = sample_export();
        export.outputs[4] = ForestOutput {
            name: "liver".into(),
            classes: vec![0, 1, 2],
            trees: vec![
                DecisionTree {
                    nodes: vec![leaf([0.6, 0.4, 0.0])],
                },
                DecisionTree {
                    nodes: vec![leaf([0.2, 0.8, 0.0])],
                },
            ],
        };
        export.outputs[3] = ForestOutput {
            name: "diabetes".into(),
            classes: vec![0, 1, 2],
            trees: vec![DecisionTree {
                nodes: vec![leaf([0.0, 0.5, 0.5])],
            }],
        };
        let model = ForestModel::from_export(export, "0".repeat(64)).expect("valid");
        let labels = model
            .predict(&FeatureVector::from([0.0; FEATURE_COUNT]))
            .expect("predict");
        assert_eq!(labels[4], 1); // mean [0.4, 0.6, 0.0]
        assert_eq!(labels[3], 1); // tie resolves to the first class
    }

    #[test]
    fn test_unexpected_classes_pass_through() {
        let mut export = sample_export();
        export.outputs[0].classes = vec![7, 8, 9];
        let model = ForestModel::from_export(export, "0".repeat(64)).expect("valid");
        let labels = model
            .predict(&FeatureVector::from([0.0; FEATURE_COUNT]))
            .expect("predict");
        // The pipeline, not the adapter, rejects out-of-range labels.
        assert_eq!(labels[0], 7);
    }
}
