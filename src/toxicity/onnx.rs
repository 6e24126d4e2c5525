// Local ONNX toxicity scorer (multi-label toxic-comment classifier).
//
// Runs entirely on the local CPU: no API calls, no rate limits. The model
// emits one logit per category; after a sigmoid each is an independent
// probability. Like a text-classification pipeline with top_k=1, we report
// only the strongest category and its probability.
//
// Model: protectai/unbiased-toxic-roberta-onnx (quantized, ~126MB)

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

use super::download::{TOXICITY_MODEL_FILE, TOXICITY_TOKENIZER_FILE};
use super::traits::{ToxicityResult, ToxicityScorer};

/// Categories in the order the model returns them.
const LABEL_ORDER: [&str; 7] = [
    "toxicity",
    "severe_toxicity",
    "obscene",
    "identity_attack",
    "insult",
    "threat",
    "sexual_explicit",
];

/// RoBERTa truncates at 512 positions.
const MAX_TOKENS: usize = 512;

/// Local ONNX-based toxicity scorer. Holds the model session and tokenizer
/// behind Arc<Mutex> so inference can be offloaded to spawn_blocking.
pub struct OnnxToxicityScorer {
    // ort::Session::run takes &mut self; spawn_blocking needs 'static handles.
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxToxicityScorer {
    /// Load the ONNX model and tokenizer from the given directory.
    ///
    /// Run `mellow download-model` first if the files are missing.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(TOXICITY_MODEL_FILE);
        let tokenizer_path = model_dir.join(TOXICITY_TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `mellow download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `mellow download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        debug!("Loaded ONNX toxicity model from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl ToxicityScorer for OnnxToxicityScorer {
    /// Tokenize, run one forward pass, sigmoid the logits, keep the top label.
    ///
    /// CPU-bound work is offloaded to spawn_blocking so the async runtime
    /// stays responsive.
    async fn score_text(&self, text: &str) -> Result<ToxicityResult> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

            let input_ids: Vec<i64> = encoding
                .get_ids()
                .iter()
                .take(MAX_TOKENS)
                .map(|&id| id as i64)
                .collect();
            let attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .take(MAX_TOKENS)
                .map(|&m| m as i64)
                .collect();

            // Shape: [1, seq_len]
            let shape = [1_i64, input_ids.len() as i64];

            let input_ids_tensor = Tensor::from_array((shape, input_ids))
                .context("Failed to create input_ids tensor")?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
                .context("Failed to create attention_mask tensor")?;

            let logits = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor
                    })
                    .context("ONNX inference failed")?;

                // Output shape: [1, 7]: raw logits (pre-sigmoid)
                let (_out_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;

                data.to_vec()
            };

            let result = top_label(&logits)?;

            debug!(
                label = %result.label,
                confidence = result.confidence,
                text_preview = %crate::output::truncate_chars(&text, 50),
                "ONNX scored text"
            );

            Ok(result)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Sigmoid activation: maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid each logit and keep the strongest category.
fn top_label(logits: &[f32]) -> Result<ToxicityResult> {
    if logits.len() < LABEL_ORDER.len() {
        anyhow::bail!(
            "Model returned {} logits, expected {}",
            logits.len(),
            LABEL_ORDER.len()
        );
    }
    let scored = LABEL_ORDER
        .iter()
        .zip(logits)
        .map(|(label, &logit)| (*label, sigmoid(logit as f64)));
    ToxicityResult::from_label_scores(scored).context("Model returned no categories")
}
