//! Step ordering algorithm (§4.H): `key(step) = (phase_rank, order, id)`,
//! realized as three sequential phases rather than one global sort, since
//! phase 2's membership depends on a value (`document_type`) that isn't
//! known until phase 1 has actually run.

use pipeline_store::models::PipelineStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PhaseRank {
    PreBranch = 1,
    ClassSpecific = 2,
    PostBranch = 3,
}

pub fn phase_rank(step: &PipelineStep) -> PhaseRank {
    if step.document_class_id.is_some() {
        PhaseRank::ClassSpecific
    } else if step.post_branching {
        PhaseRank::PostBranch
    } else {
        PhaseRank::PreBranch
    }
}

fn sorted_by_order_then_id(mut steps: Vec<PipelineStep>) -> Vec<PipelineStep> {
    steps.sort_by_key(|s| (s.order_in_phase, s.id));
    steps
}

/// Phase 1: enabled pre-branch steps, `(order, id)` ascending.
pub fn phase_one(all_steps: &[PipelineStep]) -> Vec<PipelineStep> {
    let pre_branch: Vec<PipelineStep> = all_steps
        .iter()
        .filter(|s| s.enabled && phase_rank(s) == PhaseRank::PreBranch)
        .cloned()
        .collect();
    sorted_by_order_then_id(pre_branch)
}

/// Phase 2: enabled class-specific steps for `document_class_id`, empty
/// if no class was selected or none match (§4.H, tie-breaking note: a
/// step whose class matches but is disabled is omitted, same as any
/// other disabled step).
pub fn phase_two(all_steps: &[PipelineStep], selected_class_id: Option<i32>) -> Vec<PipelineStep> {
    let Some(class_id) = selected_class_id else {
        return Vec::new();
    };
    let class_specific: Vec<PipelineStep> = all_steps
        .iter()
        .filter(|s| s.enabled && s.document_class_id == Some(class_id))
        .cloned()
        .collect();
    sorted_by_order_then_id(class_specific)
}

/// Phase 3: enabled post-branch steps, `(order, id)` ascending.
pub fn phase_three(all_steps: &[PipelineStep]) -> Vec<PipelineStep> {
    let post_branch: Vec<PipelineStep> = all_steps
        .iter()
        .filter(|s| s.enabled && phase_rank(s) == PhaseRank::PostBranch)
        .cloned()
        .collect();
    sorted_by_order_then_id(post_branch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: i32, order: i32, post_branching: bool, class_id: Option<i32>) -> PipelineStep {
        PipelineStep {
            id,
            name: format!("step-{id}"),
            description: String::new(),
            order_in_phase: order,
            document_class_id: class_id,
            post_branching,
            enabled: true,
            is_branching_step: false,
            model_id: 1,
            temperature: 0.2,
            max_tokens: 512,
            prompt_template: "{input_text}".to_string(),
            system_prompt: None,
            required_context_variables: Vec::new(),
            stop_on_values: None,
            allowed_continue_tokens: None,
            termination_reason: None,
            termination_message: None,
            retry_on_failure: true,
            max_retries: 1,
            input_source: pipeline_store::models::InputSource::PreviousStepOutput,
            output_format: pipeline_store::models::OutputFormat::Text,
            version: 1,
        }
    }

    #[test]
    fn phase_one_sorts_by_order_then_id() {
        let steps = vec![step(2, 1, false, None), step(1, 1, false, None), step(3, 0, false, None)];
        let ordered = phase_one(&steps);
        let ids: Vec<_> = ordered.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn phase_two_empty_without_selected_class() {
        let steps = vec![step(1, 0, false, Some(7))];
        assert!(phase_two(&steps, None).is_empty());
    }

    #[test]
    fn phase_two_filters_by_class_id() {
        let steps = vec![step(1, 0, false, Some(7)), step(2, 0, false, Some(8))];
        let ordered = phase_two(&steps, Some(7));
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id, 1);
    }

    #[test]
    fn disabled_step_is_omitted_from_every_phase() {
        let mut disabled = step(1, 0, false, None);
        disabled.enabled = false;
        let steps = vec![disabled];
        assert!(phase_one(&steps).is_empty());
    }
}
