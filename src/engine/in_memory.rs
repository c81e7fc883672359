//! In-process engine implementing the native boundary.
//!
//! Keeps models and example buffers in concurrent tables and counts every
//! allocation and release, so the lifecycle layer can be checked for leaks
//! and double frees without a real learning engine. Faults can be injected
//! into the next call of each failing operation.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{
    Deallocators, EngineError, ExampleDeallocator, NativeEngine, RawExample, RawModel, SaveTarget,
};

const IMAGE_MAGIC: &str = "GGLM1";
const DEFAULT_BIT_PRECISION: u32 = 18;
const DEFAULT_LEARNING_RATE: f32 = 0.5;
/// Weight tables are capped so tests can create many models cheaply.
const MAX_WEIGHT_BITS: u32 = 12;

/// Options parsed from argument text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub id: String,
    pub final_regressor: String,
    pub bit_precision: u32,
    pub interactions: Vec<String>,
    pub learning_rate: f32,
    pub no_stdin: bool,
    /// Flags this engine does not interpret, kept in order.
    pub extra: Vec<String>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            id: String::new(),
            final_regressor: String::new(),
            bit_precision: DEFAULT_BIT_PRECISION,
            interactions: Vec::new(),
            learning_rate: DEFAULT_LEARNING_RATE,
            no_stdin: false,
            extra: Vec::new(),
        }
    }
}

impl ModelOptions {
    pub fn parse(args: &str) -> Result<Self, EngineError> {
        let mut options = Self::default();
        options.apply(args)?;
        Ok(options)
    }

    /// Apply argument text on top of the current values.
    pub fn apply(&mut self, args: &str) -> Result<(), EngineError> {
        let mut tokens = args.split_whitespace();
        while let Some(flag) = tokens.next() {
            match flag {
                "--id" => self.id = value_for(flag, tokens.next())?.to_string(),
                "-f" | "--final_regressor" => {
                    self.final_regressor = value_for(flag, tokens.next())?.to_string()
                }
                "-b" | "--bit_precision" => {
                    let raw = value_for(flag, tokens.next())?;
                    self.bit_precision = match raw.parse::<u32>() {
                        Ok(bits) if (1..=32).contains(&bits) => bits,
                        _ => {
                            return Err(EngineError::InitializationFailed(format!(
                                "invalid bit precision: {}",
                                raw
                            )))
                        }
                    };
                }
                "-q" | "--quadratic" => {
                    self.interactions.push(value_for(flag, tokens.next())?.to_string())
                }
                "-l" | "--learning_rate" => {
                    let raw = value_for(flag, tokens.next())?;
                    self.learning_rate = raw.parse::<f32>().map_err(|_| {
                        EngineError::InitializationFailed(format!("invalid learning rate: {}", raw))
                    })?;
                }
                "--no_stdin" => self.no_stdin = true,
                other => self.extra.push(other.to_string()),
            }
        }
        Ok(())
    }

    fn weight_len(&self) -> usize {
        1usize << self.bit_precision.min(MAX_WEIGHT_BITS)
    }
}

fn value_for<'a>(flag: &str, value: Option<&'a str>) -> Result<&'a str, EngineError> {
    value.ok_or_else(|| EngineError::InitializationFailed(format!("missing value for {}", flag)))
}

/// Serialized form of a model, framed with a checksum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelImage {
    pub id: String,
    pub bit_precision: u32,
    pub interactions: Vec<String>,
    pub learning_rate: f32,
    pub weights: Vec<f32>,
}

impl ModelImage {
    pub fn encode(&self) -> Result<Vec<u8>, EngineError> {
        let body = serde_json::to_vec(self).map_err(|e| EngineError::SaveFailed(e.to_string()))?;
        let checksum = hex::encode(Sha256::digest(&body));
        let mut out = Vec::with_capacity(body.len() + 80);
        out.extend_from_slice(IMAGE_MAGIC.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(checksum.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EngineError> {
        let mut parts = bytes.splitn(3, |b| *b == b'\n');
        let magic = parts.next().unwrap_or_default();
        if magic != IMAGE_MAGIC.as_bytes() {
            return Err(EngineError::InvalidImage("bad magic".into()));
        }
        let checksum = parts
            .next()
            .ok_or_else(|| EngineError::InvalidImage("missing checksum".into()))?;
        let body = parts
            .next()
            .ok_or_else(|| EngineError::InvalidImage("missing body".into()))?;

        let actual = hex::encode(Sha256::digest(body));
        if checksum != actual.as_bytes() {
            return Err(EngineError::InvalidImage(format!(
                "checksum mismatch: expected {}, got {}",
                String::from_utf8_lossy(checksum),
                actual
            )));
        }

        serde_json::from_slice(body).map_err(|e| EngineError::InvalidImage(e.to_string()))
    }
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub initialized: usize,
    pub seeded: usize,
    pub finish_calls: usize,
    pub finished: usize,
    pub double_finishes: usize,
    pub abandoned: usize,
    pub parser_releases: usize,
    pub saves: usize,
    pub examples_allocated: usize,
    pub examples_freed: usize,
    pub predictions_freed: usize,
    pub labels_freed: usize,
    pub double_frees: usize,
}

#[derive(Default)]
struct Counters {
    initialized: AtomicUsize,
    seeded: AtomicUsize,
    finish_calls: AtomicUsize,
    finished: AtomicUsize,
    double_finishes: AtomicUsize,
    abandoned: AtomicUsize,
    parser_releases: AtomicUsize,
    saves: AtomicUsize,
    examples_allocated: AtomicUsize,
    examples_freed: AtomicUsize,
    predictions_freed: AtomicUsize,
    labels_freed: AtomicUsize,
    double_frees: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[derive(Debug, Default)]
struct Faults {
    initialize: bool,
    seed: bool,
    finish: bool,
    save: bool,
    deallocators: bool,
}

struct ModelState {
    options: ModelOptions,
    command_line: String,
    weights: Arc<Vec<f32>>,
    parser_live: bool,
}

impl ModelState {
    fn image(&self) -> ModelImage {
        ModelImage {
            id: self.options.id.clone(),
            bit_precision: self.options.bit_precision,
            interactions: self.options.interactions.clone(),
            learning_rate: self.options.learning_rate,
            weights: self.weights.as_ref().clone(),
        }
    }
}

/// Thread-safe in-process engine.
pub struct InMemoryEngine {
    models: DashMap<RawModel, ModelState>,
    examples: DashMap<RawExample, RawModel>,
    next_id: AtomicU64,
    counters: Arc<Counters>,
    faults: Mutex<Faults>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self {
            models: DashMap::new(),
            examples: DashMap::new(),
            next_id: AtomicU64::new(1),
            counters: Arc::new(Counters::default()),
            faults: Mutex::new(Faults::default()),
        }
    }

    pub fn stats(&self) -> EngineStats {
        let c = &self.counters;
        let load = |a: &AtomicUsize| a.load(Ordering::SeqCst);
        EngineStats {
            initialized: load(&c.initialized),
            seeded: load(&c.seeded),
            finish_calls: load(&c.finish_calls),
            finished: load(&c.finished),
            double_finishes: load(&c.double_finishes),
            abandoned: load(&c.abandoned),
            parser_releases: load(&c.parser_releases),
            saves: load(&c.saves),
            examples_allocated: load(&c.examples_allocated),
            examples_freed: load(&c.examples_freed),
            predictions_freed: load(&c.predictions_freed),
            labels_freed: load(&c.labels_freed),
            double_frees: load(&c.double_frees),
        }
    }

    /// Number of models not yet finished (including abandoned ones).
    pub fn live_models(&self) -> usize {
        self.models.len()
    }

    /// Number of example buffers not yet freed.
    pub fn live_examples(&self) -> usize {
        self.examples.len()
    }

    pub fn contains(&self, model: RawModel) -> bool {
        self.models.contains_key(&model)
    }

    pub fn options(&self, model: RawModel) -> Option<ModelOptions> {
        self.models.get(&model).map(|m| m.options.clone())
    }

    /// Returns false once parser structures were released for `model`.
    pub fn parser_live(&self, model: RawModel) -> bool {
        self.models.get(&model).map(|m| m.parser_live).unwrap_or(false)
    }

    /// Shared weight table of `model`, for checking that seeding shares state.
    pub fn weights(&self, model: RawModel) -> Option<Arc<Vec<f32>>> {
        self.models.get(&model).map(|m| Arc::clone(&m.weights))
    }

    pub fn fail_next_initialize(&self) {
        self.faults.lock().initialize = true;
    }

    pub fn fail_next_seed(&self) {
        self.faults.lock().seed = true;
    }

    pub fn fail_next_finish(&self) {
        self.faults.lock().finish = true;
    }

    pub fn fail_next_save(&self) {
        self.faults.lock().save = true;
    }

    pub fn fail_next_deallocators(&self) {
        self.faults.lock().deallocators = true;
    }

    fn next_model(&self) -> RawModel {
        RawModel::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a half-built model that is never finished.
    fn abandon(&self, options: ModelOptions) {
        let weights = Arc::new(vec![0.0; options.weight_len()]);
        let model = self.next_model();
        self.models.insert(
            model,
            ModelState { options, command_line: String::new(), weights, parser_live: true },
        );
        bump(&self.counters.abandoned);
    }

    fn with_model<T>(&self, model: RawModel, f: impl FnOnce(&ModelState) -> T) -> Result<T, EngineError> {
        self.models
            .get(&model)
            .map(|state| f(&state))
            .ok_or(EngineError::UnknownHandle(model))
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeEngine for InMemoryEngine {
    fn initialize(&self, args: &str, image: Option<&mut dyn Read>) -> Result<RawModel, EngineError> {
        let (options, weights) = match image {
            Some(reader) => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                let image = ModelImage::decode(&bytes)?;
                let mut options = ModelOptions {
                    id: image.id,
                    bit_precision: image.bit_precision,
                    interactions: image.interactions,
                    learning_rate: image.learning_rate,
                    ..ModelOptions::default()
                };
                options.apply(args)?;
                (options, image.weights)
            }
            None => {
                let options = ModelOptions::parse(args)?;
                let weights = vec![0.0; options.weight_len()];
                (options, weights)
            }
        };

        if std::mem::take(&mut self.faults.lock().initialize) {
            self.abandon(options);
            return Err(EngineError::InitializationFailed("injected fault".into()));
        }

        let model = self.next_model();
        self.models.insert(
            model,
            ModelState {
                options,
                command_line: args.trim().to_string(),
                weights: Arc::new(weights),
                parser_live: true,
            },
        );
        bump(&self.counters.initialized);
        Ok(model)
    }

    fn seed_model(&self, base: RawModel, args: &str) -> Result<RawModel, EngineError> {
        // Copy out before inserting: holding a shard guard across insert can deadlock.
        let (mut options, weights) = self
            .with_model(base, |state| (state.options.clone(), Arc::clone(&state.weights)))
            .map_err(|_| EngineError::SeedFailed { base, reason: "unknown base model".into() })?;

        options.id.clear();
        options.final_regressor.clear();
        options.no_stdin = false;
        options.extra.clear();
        options
            .apply(args)
            .map_err(|e| EngineError::SeedFailed { base, reason: e.to_string() })?;

        if std::mem::take(&mut self.faults.lock().seed) {
            self.abandon(options);
            return Err(EngineError::SeedFailed { base, reason: "injected fault".into() });
        }

        let model = self.next_model();
        self.models.insert(
            model,
            ModelState { options, command_line: args.trim().to_string(), weights, parser_live: true },
        );
        bump(&self.counters.seeded);
        Ok(model)
    }

    fn finish(&self, model: RawModel) -> Result<(), EngineError> {
        bump(&self.counters.finish_calls);

        if std::mem::take(&mut self.faults.lock().finish) {
            return Err(EngineError::FinishFailed { model, reason: "injected fault".into() });
        }

        match self.models.remove(&model) {
            Some(_) => {
                bump(&self.counters.finished);
                Ok(())
            }
            None => {
                bump(&self.counters.double_finishes);
                Err(EngineError::UnknownHandle(model))
            }
        }
    }

    fn release_parser_datastructures(&self, model: RawModel) {
        if let Some(mut state) = self.models.get_mut(&model) {
            state.parser_live = false;
        }
        bump(&self.counters.parser_releases);
    }

    fn save_predictor(&self, model: RawModel, target: SaveTarget<'_>) -> Result<(), EngineError> {
        if std::mem::take(&mut self.faults.lock().save) {
            return Err(EngineError::SaveFailed("injected fault".into()));
        }

        let bytes = self.with_model(model, ModelState::image)?.encode()?;
        match target {
            SaveTarget::File(path) => {
                let mut file = std::fs::File::create(path)?;
                file.write_all(&bytes)?;
                file.flush()?;
            }
            SaveTarget::Stream(writer) => {
                writer.write_all(&bytes)?;
                writer.flush()?;
            }
        }
        bump(&self.counters.saves);
        Ok(())
    }

    fn are_features_compatible(&self, a: RawModel, b: RawModel) -> Option<String> {
        let (left, right) = match (self.options(a), self.options(b)) {
            (Some(left), Some(right)) => (left, right),
            _ => return Some("unknown model handle".to_string()),
        };

        if left.bit_precision != right.bit_precision {
            return Some(format!(
                "bit precision differs: {} vs {}",
                left.bit_precision, right.bit_precision
            ));
        }

        let mut li = left.interactions.clone();
        let mut ri = right.interactions.clone();
        li.sort();
        ri.sort();
        if li != ri {
            return Some(format!(
                "interactions differ: [{}] vs [{}]",
                li.join(" "),
                ri.join(" ")
            ));
        }

        None
    }

    fn deallocators(&self, model: RawModel) -> Result<Deallocators, EngineError> {
        if !self.contains(model) || std::mem::take(&mut self.faults.lock().deallocators) {
            return Err(EngineError::UnknownHandle(model));
        }
        let predictions = Arc::clone(&self.counters);
        let labels = Arc::clone(&self.counters);
        Ok(Deallocators {
            delete_prediction: Arc::new(move |_| bump(&predictions.predictions_freed)),
            delete_label: Arc::new(move |_| bump(&labels.labels_freed)),
        })
    }

    fn alloc_example(&self, model: RawModel) -> Result<RawExample, EngineError> {
        if !self.contains(model) {
            return Err(EngineError::UnknownHandle(model));
        }
        let example = RawExample::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.examples.insert(example, model);
        bump(&self.counters.examples_allocated);
        Ok(example)
    }

    fn dealloc_example(
        &self,
        delete_label: &ExampleDeallocator,
        example: RawExample,
        delete_prediction: &ExampleDeallocator,
    ) {
        if self.examples.remove(&example).is_none() {
            bump(&self.counters.double_frees);
            return;
        }
        delete_label(example);
        delete_prediction(example);
        bump(&self.counters.examples_freed);
    }

    fn id(&self, model: RawModel) -> Result<String, EngineError> {
        self.with_model(model, |state| state.options.id.clone())
    }

    fn set_id(&self, model: RawModel, id: &str) -> Result<(), EngineError> {
        let mut state = self.models.get_mut(&model).ok_or(EngineError::UnknownHandle(model))?;
        state.options.id = id.to_string();
        Ok(())
    }

    fn final_regressor_name(&self, model: RawModel) -> Result<String, EngineError> {
        self.with_model(model, |state| state.options.final_regressor.clone())
    }

    fn command_line(&self, model: RawModel) -> Result<String, EngineError> {
        self.with_model(model, |state| state.command_line.clone())
    }
}
