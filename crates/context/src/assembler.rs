//! Priority-ordered token budget assembly.
//!
//! Assembles the prompt payload from six sections:
//!
//! 1. **Fixed** (system, instructions, guardrails) — counted first, never
//!    trimmed; if fixed text alone exceeds the budget the call fails
//! 2. **Current scene** — the target scene's body
//! 3. **Scene window** — preceding-scene summaries
//! 4. **Canon facts** — gated facts, highest confidence first
//! 5. **Supporting material** — ranked entities and related scenes
//! 6. **Style guidelines** — project style guides
//!
//! Droppable sections are flattened into one global priority order and
//! filled greedily with a prefix rule: inclusion stops at the first block
//! that does not fit, so a lower-priority block is never retained past an
//! omitted higher-priority one, and no block is ever split mid-content.
//!
//! # Determinism
//!
//! Assembly is pure: identical inputs always produce identical outputs. No
//! random or time-dependent logic.

use storyloom_config::PromptConfig;
use storyloom_core::error::ComposeError;
use storyloom_core::request::{AssemblyStats, DropRecord, PromptObject, SectionStats};
use storyloom_core::tokenizer::Tokenizer;

use crate::ranker::Ranked;
use crate::token;
use crate::window::WindowSlot;

/// A canon fact that passed the reveal gate, rendered for the prompt.
#[derive(Debug, Clone)]
pub struct VisibleFact {
    pub fact_id: String,
    /// "Entity name: fact text", possibly spoiler-prefixed.
    pub rendered: String,
    pub confidence: f32,
}

/// All inputs for one assembly pass.
pub struct AssemblyInput<'a> {
    /// Fixed prompt sections (never trimmed).
    pub prompt: &'a PromptConfig,
    /// Rendered body of the target scene.
    pub scene_body: String,
    /// Continuity window, oldest → newest.
    pub window: Vec<WindowSlot>,
    /// Gated facts, highest confidence first.
    pub facts: Vec<VisibleFact>,
    /// Supporting material, highest score first.
    pub ranked: Vec<Ranked>,
    /// Project style guidelines, in creation order.
    pub style_guidelines: Vec<String>,
    /// Hard token budget.
    pub max_tokens: usize,
}

const SECTION_FIXED: &str = "fixed";
const SECTION_SCENE: &str = "current_scene";
const SECTION_WINDOW: &str = "scene_window";
const SECTION_FACTS: &str = "canon_facts";
const SECTION_SUPPORT: &str = "supporting";
const SECTION_STYLE: &str = "style_guidelines";

/// One droppable block in global priority order.
struct Block {
    section: &'static str,
    text: String,
    tokens: usize,
}

/// Assemble the payload, enforcing the budget losslessly by priority.
///
/// Returns the prompt, the total token estimate (always ≤ `max_tokens`),
/// and the accounting stats.
pub fn assemble(
    input: AssemblyInput<'_>,
    tokenizer: &dyn Tokenizer,
    model: &str,
) -> Result<(PromptObject, usize, AssemblyStats), ComposeError> {
    let count = |text: &str| token::count_tokens(tokenizer, text, model);

    // ── Fixed sections: counted first, never trimmed ───────────────────────
    let fixed_tokens = count(&input.prompt.system)
        + count(&input.prompt.instructions)
        + input
            .prompt
            .guardrails
            .iter()
            .map(|g| count(g))
            .sum::<usize>();

    if fixed_tokens > input.max_tokens {
        return Err(ComposeError::BudgetInfeasible {
            fixed_tokens,
            max_tokens: input.max_tokens,
        });
    }

    // ── Flatten droppable content into global priority order ───────────────
    // Within the window, scenes closer to the target outrank older ones, so
    // the budget walk sees newest → oldest even though emission order is
    // oldest → newest.
    let mut blocks: Vec<Block> = Vec::new();
    blocks.push(Block {
        section: SECTION_SCENE,
        text: format!("[Current scene] {}", input.scene_body),
        tokens: 0,
    });
    for slot in input.window.iter().rev() {
        blocks.push(Block {
            section: SECTION_WINDOW,
            text: slot.render(),
            tokens: 0,
        });
    }
    for fact in &input.facts {
        blocks.push(Block {
            section: SECTION_FACTS,
            text: fact.rendered.clone(),
            tokens: 0,
        });
    }
    for ranked in &input.ranked {
        blocks.push(Block {
            section: SECTION_SUPPORT,
            text: format!("[Related {}] {}", ranked.kind, ranked.text),
            tokens: 0,
        });
    }
    for guideline in &input.style_guidelines {
        blocks.push(Block {
            section: SECTION_STYLE,
            text: guideline.clone(),
            tokens: 0,
        });
    }
    for block in &mut blocks {
        block.tokens = count(&block.text);
    }

    // ── Prefix fill ────────────────────────────────────────────────────────
    let mut remaining = input.max_tokens - fixed_tokens;
    let mut included: Vec<bool> = Vec::with_capacity(blocks.len());
    let mut exhausted = false;
    for block in &blocks {
        if exhausted || block.tokens > remaining {
            exhausted = true;
            included.push(false);
        } else {
            remaining -= block.tokens;
            included.push(true);
        }
    }

    // ── Accounting ─────────────────────────────────────────────────────────
    let mut stats = AssemblyStats {
        budget: input.max_tokens,
        sections: vec![SectionStats {
            name: SECTION_FIXED.into(),
            tokens: fixed_tokens,
            blocks_included: 2 + input.prompt.guardrails.len(),
            blocks_total: 2 + input.prompt.guardrails.len(),
        }],
        drops: vec![],
    };
    for section in [
        SECTION_SCENE,
        SECTION_WINDOW,
        SECTION_FACTS,
        SECTION_SUPPORT,
        SECTION_STYLE,
    ] {
        let mut tokens = 0;
        let mut kept = 0;
        let mut total = 0;
        let mut dropped_tokens = 0;
        for (block, inc) in blocks.iter().zip(&included) {
            if block.section != section {
                continue;
            }
            total += 1;
            if *inc {
                kept += 1;
                tokens += block.tokens;
            } else {
                dropped_tokens += block.tokens;
            }
        }
        stats.sections.push(SectionStats {
            name: section.into(),
            tokens,
            blocks_included: kept,
            blocks_total: total,
        });
        if total > kept {
            stats.drops.push(DropRecord {
                section: section.into(),
                blocks_dropped: total - kept,
                tokens_dropped: dropped_tokens,
                reason: "token budget exhausted".into(),
            });
        }
    }

    // ── Emit the prompt object ─────────────────────────────────────────────
    // Window slots go out oldest → newest; the budget walk above visited
    // them newest → oldest, so re-collect in input (chronological) order.
    let kept_texts = |section: &str| -> Vec<String> {
        blocks
            .iter()
            .zip(&included)
            .filter(|(b, inc)| b.section == section && **inc)
            .map(|(b, _)| b.text.clone())
            .collect()
    };

    let mut scene_context: Vec<String> = kept_texts(SECTION_WINDOW);
    scene_context.reverse(); // newest-first walk → oldest-first emission
    scene_context.extend(kept_texts(SECTION_SCENE));
    scene_context.extend(kept_texts(SECTION_SUPPORT));

    let prompt = PromptObject {
        system: input.prompt.system.clone(),
        instructions: input.prompt.instructions.clone(),
        scene_context,
        canon_facts: kept_texts(SECTION_FACTS),
        style_guidelines: kept_texts(SECTION_STYLE),
        guardrails: input.prompt.guardrails.clone(),
    };

    let token_estimate = input.max_tokens - remaining;
    Ok((prompt, token_estimate, stats))
}
