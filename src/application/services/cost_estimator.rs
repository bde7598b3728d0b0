use rust_decimal::Decimal;

use crate::domain::{
    Chunk, CostBreakdown, CostEstimate, DocumentId, LlmProvider, ModelPricing, PromptTemplate,
};

/// Conservative ratio that also holds for CJK-heavy text.
const CHARS_PER_TOKEN: f64 = 2.5;
const LARGE_CHUNK_CHARS: f64 = 3000.0;
const COST_DECIMALS: u32 = 4;
const WILDCARD_MODEL: &str = "*";

/// Rates in micro-dollars per 1K tokens.
struct PriceEntry {
    provider: LlmProvider,
    model: &'static str,
    input: i64,
    output: i64,
}

const DEFAULT_INPUT_PRICE: i64 = 10_000;
const DEFAULT_OUTPUT_PRICE: i64 = 30_000;

const PRICE_TABLE: &[PriceEntry] = &[
    price(LlmProvider::OpenAi, "gpt-4", 10_000, 60_000),
    price(LlmProvider::OpenAi, "gpt-4-turbo", 10_000, 30_000),
    price(LlmProvider::OpenAi, "gpt-4-turbo-preview", 10_000, 30_000),
    price(LlmProvider::OpenAi, "gpt-3.5-turbo", 500, 1_500),
    price(LlmProvider::OpenAi, "gpt-3.5-turbo-16k", 1_000, 2_000),
    price(LlmProvider::Anthropic, "claude-3-opus", 15_000, 75_000),
    price(LlmProvider::Anthropic, "claude-3-opus-20240229", 15_000, 75_000),
    price(LlmProvider::Anthropic, "claude-3-sonnet", 3_000, 15_000),
    price(LlmProvider::Anthropic, "claude-3-sonnet-20240229", 3_000, 15_000),
    price(LlmProvider::Anthropic, "claude-3-haiku", 250, 1_250),
    price(LlmProvider::Anthropic, "claude-3-haiku-20240307", 250, 1_250),
    price(LlmProvider::Ollama, WILDCARD_MODEL, 0, 0),
];

const fn price(provider: LlmProvider, model: &'static str, input: i64, output: i64) -> PriceEntry {
    PriceEntry {
        provider,
        model,
        input,
        output,
    }
}

fn micros(value: i64) -> Decimal {
    Decimal::new(value, 6).normalize()
}

/// Pure pricing and pre-flight estimation. No I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostEstimator;

impl CostEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Exact model, then provider wildcard, then longest known model-family prefix,
    /// then the default rate.
    pub fn pricing_for(&self, provider: LlmProvider, model: &str) -> ModelPricing {
        let model_lower = model.trim().to_lowercase();
        let entries: Vec<&PriceEntry> = PRICE_TABLE
            .iter()
            .filter(|e| e.provider == provider)
            .collect();

        let matched = entries
            .iter()
            .find(|e| e.model == model_lower)
            .or_else(|| entries.iter().find(|e| e.model == WILDCARD_MODEL))
            .or_else(|| {
                entries
                    .iter()
                    .filter(|e| model_lower.starts_with(e.model))
                    .max_by_key(|e| e.model.len())
            });

        let (input, output) = matched
            .map(|e| (e.input, e.output))
            .unwrap_or((DEFAULT_INPUT_PRICE, DEFAULT_OUTPUT_PRICE));

        ModelPricing {
            provider,
            model: model.to_string(),
            input_price_per_1k: micros(input),
            output_price_per_1k: micros(output),
        }
    }

    pub fn cost_of(
        &self,
        provider: LlmProvider,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> CostBreakdown {
        self.pricing_for(provider, model)
            .cost_of(input_tokens, output_tokens)
    }

    pub fn estimate(
        &self,
        document_id: DocumentId,
        chunks: &[Chunk],
        provider: LlmProvider,
        model: &str,
        prompt_template: &PromptTemplate,
        max_tokens: u32,
    ) -> CostEstimate {
        let model_pricing = self.pricing_for(provider, model);
        let total_chunks = chunks.len() as u64;

        if total_chunks == 0 {
            return CostEstimate {
                document_id,
                total_chunks: 0,
                estimated_input_tokens: 0,
                estimated_output_tokens: 0,
                estimated_total_tokens: 0,
                cost_breakdown: CostBreakdown::default(),
                cost_per_chunk_usd: Decimal::ZERO,
                model_pricing,
                warnings: vec![
                    "This document has no chunks to analyse.".to_string(),
                    "Upload the document and generate its chunks first.".to_string(),
                ],
            };
        }

        let total_chars: usize = chunks.iter().map(Chunk::char_len).sum();
        let avg_chunk_length = total_chars as f64 / total_chunks as f64;
        let avg_chunk_tokens = (avg_chunk_length / CHARS_PER_TOKEN) as u64;

        let overhead_chars = prompt_template.overhead_text().chars().count();
        let prompt_overhead_tokens = (overhead_chars as f64 / CHARS_PER_TOKEN) as u64;

        let estimated_input_tokens = (avg_chunk_tokens + prompt_overhead_tokens) * total_chunks;
        let estimated_output_tokens = u64::from(max_tokens) * total_chunks;

        let cost = model_pricing.cost_of(estimated_input_tokens, estimated_output_tokens);
        let cost_per_chunk_usd = cost.total_cost_usd / Decimal::from(total_chunks);

        let warnings = cost_warnings(
            cost.total_cost_usd,
            total_chunks,
            provider,
            avg_chunk_length,
        );

        CostEstimate {
            document_id,
            total_chunks,
            estimated_input_tokens,
            estimated_output_tokens,
            estimated_total_tokens: estimated_input_tokens + estimated_output_tokens,
            cost_breakdown: cost.round_dp(COST_DECIMALS),
            cost_per_chunk_usd: cost_per_chunk_usd.round_dp(COST_DECIMALS),
            model_pricing,
            warnings,
        }
    }
}

fn cost_warnings(
    total_cost: Decimal,
    total_chunks: u64,
    provider: LlmProvider,
    avg_chunk_length: f64,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let shown = total_cost.round_dp(2);

    if provider.is_local() {
        warnings.push("Local model in use: no API cost will be incurred.".to_string());
    } else if total_cost > Decimal::from(20) {
        warnings.push(format!(
            "Very high cost warning: this job may cost about ${shown}."
        ));
    } else if total_cost > Decimal::from(10) {
        warnings.push(format!("High cost warning: this job may cost about ${shown}."));
    } else if total_cost > Decimal::ONE {
        warnings.push(format!("This job may cost about ${shown}."));
    } else {
        warnings.push(format!("Estimated cost: about ${shown}."));
    }

    warnings.push(format!("{total_chunks} chunks will be processed."));

    if avg_chunk_length > LARGE_CHUNK_CHARS {
        warnings.push(format!(
            "Chunks are large (average {} characters); actual token usage may exceed the estimate.",
            avg_chunk_length as u64
        ));
    }

    warnings.push(
        "Actual cost depends on chunk size, response length and provider price changes."
            .to_string(),
    );
    warnings.push(
        "Enable pause-after-batch to review spend between batches and stop early.".to_string(),
    );

    warnings
}
