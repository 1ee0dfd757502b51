//! Local text generation with candle phi3 and llama models

use crate::config::GenerativeConfig;
use crate::error::{Result, ResumeParserError};
use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::{llama, phi3};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::Tokenizer;
use tokio::sync::Mutex;

/// Prompt in, completion out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    fn name(&self) -> &str;
}

const EOS_TOKENS: [&str; 5] = ["<|end|>", "<|endoftext|>", "</s>", "<|eot_id|>", "<|end_of_text|>"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatTemplate {
    Phi,
    Llama3,
    Plain,
}

impl ChatTemplate {
    fn wrap(&self, prompt: &str) -> String {
        match self {
            ChatTemplate::Phi => format!("<|user|>\n{}<|end|>\n<|assistant|>\n", prompt.trim()),
            ChatTemplate::Llama3 => format!(
                "<|begin_of_text|><|start_header_id|>user<|end_header_id|>\n\n{}<|eot_id|><|start_header_id|>assistant<|end_header_id|>\n\n",
                prompt.trim()
            ),
            ChatTemplate::Plain => prompt.to_string(),
        }
    }
}

/// Causal language model with an internal KV cache
trait CausalLm: Send {
    fn forward(&mut self, input_ids: &Tensor, start_pos: usize) -> Result<Tensor>;
    fn reset(&mut self) -> Result<()>;
}

struct PhiModel {
    model: phi3::Model,
}

impl CausalLm for PhiModel {
    fn forward(&mut self, input_ids: &Tensor, start_pos: usize) -> Result<Tensor> {
        Ok(self.model.forward(input_ids, start_pos)?)
    }

    fn reset(&mut self) -> Result<()> {
        self.model.clear_kv_cache();
        Ok(())
    }
}

struct LlamaModel {
    model: llama::Llama,
    cache: llama::Cache,
    config: llama::Config,
    device: Device,
}

impl CausalLm for LlamaModel {
    fn forward(&mut self, input_ids: &Tensor, start_pos: usize) -> Result<Tensor> {
        Ok(self.model.forward(input_ids, start_pos, &mut self.cache)?)
    }

    fn reset(&mut self) -> Result<()> {
        self.cache = llama::Cache::new(true, DType::F32, &self.config, &self.device)?;
        Ok(())
    }
}

struct GeneratorState {
    model: Box<dyn CausalLm>,
    logits: LogitsProcessor,
}

/// Read-only half of the generator, shared with the blocking decode task
struct Decoder {
    tokenizer: Tokenizer,
    device: Device,
    template: ChatTemplate,
    eos_ids: Vec<u32>,
    max_tokens: usize,
}

pub struct CandleGenerator {
    state: Arc<Mutex<GeneratorState>>,
    decoder: Arc<Decoder>,
    name: String,
}

impl CandleGenerator {
    pub fn load(model_dir: &Path, device: Device, config: &GenerativeConfig) -> Result<Self> {
        log::info!("Loading generator from {}", model_dir.display());

        let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
            .map_err(|e| ResumeParserError::ModelLoading(format!("Failed to load tokenizer: {}", e)))?;

        let config_content = std::fs::read_to_string(model_dir.join("config.json"))
            .map_err(|e| ResumeParserError::ModelLoading(format!("Failed to read model config: {}", e)))?;
        let model_config: serde_json::Value = serde_json::from_str(&config_content)?;

        let model_type = model_config["model_type"].as_str().unwrap_or("unknown");
        let architecture = model_config["architectures"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&weight_files(model_dir)?, DType::F32, &device)?
        };

        let (model, template): (Box<dyn CausalLm>, ChatTemplate) = match (model_type, architecture) {
            ("phi3", _) | (_, "Phi3ForCausalLM") => {
                log::debug!("Loading phi3 architecture");
                let config: phi3::Config = serde_json::from_str(&config_content)?;
                let model = phi3::Model::new(&config, vb)?;
                (Box::new(PhiModel { model }), ChatTemplate::Phi)
            }
            ("llama", _) | (_, "LlamaForCausalLM") => {
                log::debug!("Loading llama architecture");
                let config = serde_json::from_str::<llama::LlamaConfig>(&config_content)?.into_config(false);
                let model = llama::Llama::load(vb, &config)?;
                let cache = llama::Cache::new(true, DType::F32, &config, &device)?;
                let template = if tokenizer.token_to_id("<|eot_id|>").is_some() {
                    ChatTemplate::Llama3
                } else {
                    ChatTemplate::Plain
                };
                let model = LlamaModel {
                    model,
                    cache,
                    config,
                    device: device.clone(),
                };
                (Box::new(model), template)
            }
            _ => {
                return Err(ResumeParserError::ModelLoading(format!(
                    "Unsupported generator architecture '{}' ({})",
                    architecture, model_type
                )))
            }
        };

        let eos_ids = EOS_TOKENS
            .iter()
            .filter_map(|token| tokenizer.token_to_id(token))
            .collect::<Vec<_>>();

        let logits = LogitsProcessor::new(config.seed, sampling_temperature(config.temperature), config.top_p);

        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().replacen("--", "/", 1))
            .unwrap_or_else(|| "generator".to_string());

        log::info!("Generator {} loaded", name);

        Ok(Self {
            state: Arc::new(Mutex::new(GeneratorState { model, logits })),
            decoder: Arc::new(Decoder {
                tokenizer,
                device,
                template,
                eos_ids,
                max_tokens: config.max_tokens,
            }),
            name,
        })
    }
}

impl Decoder {
    fn run(&self, state: &mut GeneratorState, prompt: &str) -> Result<String> {
        state.model.reset()?;

        let formatted = self.template.wrap(prompt);
        let encoding = self
            .tokenizer
            .encode(formatted.as_str(), self.template == ChatTemplate::Plain)
            .map_err(|e| ResumeParserError::ModelError(format!("Failed to tokenize prompt: {}", e)))?;
        let prompt_tokens = encoding.get_ids().to_vec();
        log::debug!("Prompt is {} tokens", prompt_tokens.len());

        let input = Tensor::new(prompt_tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        let mut logits = state.model.forward(&input, 0)?;
        let mut generated = Vec::new();

        for step in 0..self.max_tokens {
            let next = state.logits.sample(&last_token_logits(&logits)?)?;
            if self.eos_ids.contains(&next) {
                break;
            }
            generated.push(next);

            let input = Tensor::new(&[next], &self.device)?.unsqueeze(0)?;
            logits = state.model.forward(&input, prompt_tokens.len() + step)?;
        }

        log::debug!("Generated {} tokens", generated.len());
        self.tokenizer
            .decode(&generated, true)
            .map_err(|e| ResumeParserError::ModelError(format!("Failed to decode output: {}", e)))
    }
}

#[async_trait]
impl TextGenerator for CandleGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut state = self.state.clone().lock_owned().await;
        let decoder = self.decoder.clone();
        let prompt = prompt.to_string();

        off_runtime(move || decoder.run(&mut state, &prompt))
            .await
            .map_err(|e| match e {
                ResumeParserError::ModelInvocation(_) => e,
                other => ResumeParserError::ModelInvocation(other.to_string()),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Run a CPU-bound job on the blocking pool so async workers stay responsive
async fn off_runtime<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ResumeParserError::ModelInvocation(format!("generation task failed: {}", e)))?
}

/// Greedy decoding for non-positive temperatures
fn sampling_temperature(temperature: f64) -> Option<f64> {
    if temperature > 0.0 {
        Some(temperature)
    } else {
        None
    }
}

fn weight_files(model_dir: &Path) -> Result<Vec<PathBuf>> {
    let index = model_dir.join("model.safetensors.index.json");
    if index.exists() {
        let content = std::fs::read_to_string(&index)?;
        return Ok(crate::models::manager::shard_files(&content)?
            .into_iter()
            .map(|shard| model_dir.join(shard))
            .collect());
    }

    let single = model_dir.join("model.safetensors");
    if single.exists() {
        return Ok(vec![single]);
    }

    Err(ResumeParserError::ModelLoading(format!(
        "No safetensors weights in {}",
        model_dir.display()
    )))
}

/// Logits of the final position, whatever the model's output rank
fn last_token_logits(logits: &Tensor) -> Result<Tensor> {
    let logits = match logits.dims() {
        [_, seq_len, _] => logits.i((0, seq_len - 1))?,
        [seq_len, _] if *seq_len > 1 => logits.i(seq_len - 1)?,
        [_, _] => logits.i(0)?,
        _ => logits.clone(),
    };
    Ok(logits.to_dtype(DType::F32)?)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_templates() {
        assert_eq!(
            ChatTemplate::Phi.wrap(" extract "),
            "<|user|>\nextract<|end|>\n<|assistant|>\n"
        );
        assert!(ChatTemplate::Llama3.wrap("x").ends_with("<|end_header_id|>\n\n"));
        assert_eq!(ChatTemplate::Plain.wrap("x"), "x");
    }

    #[test]
    fn test_last_token_logits_shapes() {
        let device = Device::Cpu;
        let three = Tensor::new(&[[[1f32, 2.], [3., 4.]]], &device).unwrap();
        assert_eq!(last_token_logits(&three).unwrap().to_vec1::<f32>().unwrap(), vec![3., 4.]);

        let two = Tensor::new(&[[1f32, 2.], [5., 6.]], &device).unwrap();
        assert_eq!(last_token_logits(&two).unwrap().to_vec1::<f32>().unwrap(), vec![5., 6.]);

        let one = Tensor::new(&[7f32, 8.], &device).unwrap();
        assert_eq!(last_token_logits(&one).unwrap().to_vec1::<f32>().unwrap(), vec![7., 8.]);
    }

    #[test]
    fn test_zero_temperature_is_greedy() {
        assert_eq!(sampling_temperature(0.0), None);
        assert_eq!(sampling_temperature(0.1), Some(0.1));
    }

    #[tokio::test]
    async fn test_decoding_runs_off_the_runtime_thread() {
        let runtime_thread = std::thread::current().id();
        let decode_thread = off_runtime(|| Ok(std::thread::current().id())).await.unwrap();
        assert_ne!(decode_thread, runtime_thread);

        let failed: Result<()> = off_runtime(|| Err(ResumeParserError::ModelError("oom".to_string()))).await;
        assert!(matches!(failed, Err(ResumeParserError::ModelError(_))));
    }

    #[tokio::test]
    async fn test_panicking_decode_becomes_invocation_error() {
        let result: Result<String> = off_runtime(|| panic!("decode loop crashed")).await;
        assert!(matches!(result, Err(ResumeParserError::ModelInvocation(msg)) if msg.contains("generation task failed")));
    }

    #[test]
    fn test_missing_weights_are_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            weight_files(dir.path()),
            Err(ResumeParserError::ModelLoading(_))
        ));
    }
}
