use anyhow::{anyhow, ensure, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use kbsearch_core::traits::Embedder;
use tokenizers::Tokenizer;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

pub const MINILM_DIM: usize = 384;
pub const MINILM_MODEL_ID: &str = "all-MiniLM-L6-v2";
const BERT_PAD_ID: u32 = 0;

/// Sentence embedder for all-MiniLM-L6-v2 loaded from local files.
pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
}

impl MiniLmEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading {MINILM_MODEL_ID}");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        tracing::info!("{MINILM_MODEL_ID} loaded");
        Ok(Self { model, tokenizer, device, max_len })
    }

    fn forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, BERT_PAD_ID, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        for row in &rows { ensure!(row.len() == MINILM_DIM, "unexpected embedding width {}", row.len()); }
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 250 { tracing::warn!(batch = texts.len(), ?elapsed, "slow embedding"); }
        Ok(rows)
    }
}

impl Embedder for MiniLmEmbedder {
    fn id(&self) -> &str { MINILM_MODEL_ID }
    fn dim(&self) -> usize { MINILM_DIM }
    fn max_len(&self) -> usize { self.max_len }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.forward(&[text.to_string()])?.pop().ok_or_else(|| anyhow!("model returned no embedding"))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { self.forward(texts) }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        let tensors = candle_core::safetensors::load(&safetensors, device)?;
        return Ok(VarBuilder::from_tensors(tensors, DType::F32, device));
    }
    let bin = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&bin)?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

/// Finds the model directory: explicit setting, then `APP_MODEL_DIR`,
/// `MODEL_DIR`, then the conventional `models/` locations.
pub fn resolve_model_dir(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = configured {
        if p.exists() { return Ok(p.to_path_buf()); }
        tracing::warn!(dir = %p.display(), "configured model dir does not exist");
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { tracing::info!(dir = %p.display(), "using {var}"); return Ok(p); }
        }
    }
    for candidate in ["models/all-MiniLM-L6-v2", "../models/all-MiniLM-L6-v2"] {
        let p = Path::new(candidate);
        if p.exists() { return Ok(p.to_path_buf()); }
    }
    Err(anyhow!("Could not locate {MINILM_MODEL_ID} model directory"))
}
