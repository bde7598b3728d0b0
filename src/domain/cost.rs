use rust_decimal::Decimal;

use super::{DocumentId, LlmProvider};

const TOKENS_PER_PRICE_UNIT: u64 = 1000;

/// USD rates per 1K tokens for one provider/model pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPricing {
    pub provider: LlmProvider,
    pub model: String,
    pub input_price_per_1k: Decimal,
    pub output_price_per_1k: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostBreakdown {
    pub input_cost_usd: Decimal,
    pub output_cost_usd: Decimal,
    pub total_cost_usd: Decimal,
}

impl ModelPricing {
    pub fn cost_of(&self, input_tokens: u64, output_tokens: u64) -> CostBreakdown {
        let per_unit = Decimal::from(TOKENS_PER_PRICE_UNIT);
        let input_cost_usd = Decimal::from(input_tokens) / per_unit * self.input_price_per_1k;
        let output_cost_usd = Decimal::from(output_tokens) / per_unit * self.output_price_per_1k;
        CostBreakdown {
            input_cost_usd,
            output_cost_usd,
            total_cost_usd: input_cost_usd + output_cost_usd,
        }
    }
}

impl CostBreakdown {
    pub fn round_dp(&self, dp: u32) -> Self {
        Self {
            input_cost_usd: self.input_cost_usd.round_dp(dp),
            output_cost_usd: self.output_cost_usd.round_dp(dp),
            total_cost_usd: self.total_cost_usd.round_dp(dp),
        }
    }
}

/// Pre-flight projection of what analysing a document would cost. Not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CostEstimate {
    pub document_id: DocumentId,
    pub total_chunks: u64,
    pub estimated_input_tokens: u64,
    pub estimated_output_tokens: u64,
    pub estimated_total_tokens: u64,
    pub cost_breakdown: CostBreakdown,
    pub cost_per_chunk_usd: Decimal,
    pub model_pricing: ModelPricing,
    pub warnings: Vec<String>,
}
