//! Domain to DTO conversions.

use api_shared::{
    ConsentCaptureRes, ConsentCategoryRes, ConsentDefinitionRes, ConsentOptionRes,
    ConsentOptionsRes, TaskRes,
};
use caravan::{Applicability, ConsentCapture, ConsentDefinition, ConsentOption, ConsentOptions};
use companion_core::CompanionTask;

pub fn definition_res(definition: &ConsentDefinition) -> ConsentDefinitionRes {
    ConsentDefinitionRes {
        id: definition.id.get(),
        name: definition.name.clone(),
        version: definition.version.clone(),
        category_id: definition.category_id.get(),
        language_id: definition.language_id.get(),
        mandatory: definition.mandatory,
        signer_ids: definition.signer_ids.iter().map(|s| s.get()).collect(),
        service_line_ids: match &definition.service_lines {
            Applicability::All => None,
            Applicability::Only(ids) => Some(ids.iter().map(|id| id.get()).collect()),
        },
        state_codes: match &definition.states {
            Applicability::All => None,
            Applicability::Only(states) => Some(states.iter().map(|s| s.to_string()).collect()),
        },
        expires_after: definition.expiry.map(|e| e.count),
        expiration_unit: definition.expiry.map(|e| e.unit.as_str().to_string()),
    }
}

fn option_res(option: &ConsentOption) -> ConsentOptionRes {
    ConsentOptionRes {
        id: option.id,
        name: option.name.clone(),
    }
}

pub fn options_res(options: &ConsentOptions) -> ConsentOptionsRes {
    ConsentOptionsRes {
        categories: options
            .ordered_categories()
            .into_iter()
            .map(|c| ConsentCategoryRes {
                id: c.id.get(),
                name: c.name.clone(),
                order: c.order,
                required: c.required,
            })
            .collect(),
        signers: options.signers.iter().map(option_res).collect(),
        languages: options.languages.iter().map(option_res).collect(),
        frequencies: options.frequencies.iter().map(option_res).collect(),
        capture_methods: options.capture_methods.iter().map(option_res).collect(),
    }
}

pub fn capture_res(capture: &ConsentCapture) -> ConsentCaptureRes {
    ConsentCaptureRes {
        id: capture.id.get(),
        definition_id: capture.definition_id.get(),
        episode_id: capture.episode_id.get(),
        patient_id: capture.patient_id.get(),
        visit_id: capture.visit_id.get(),
        service_line_id: capture.service_line_id.get(),
        signer: capture.signer.get(),
        verbal: capture.verbal,
        created_at: capture.created_at.map(|t| t.to_rfc3339()),
    }
}

pub fn task_res(task: &CompanionTask) -> TaskRes {
    TaskRes {
        id: task.id.get(),
        link_id: task.link_id.to_string(),
        task_type: task.task_type.to_string(),
        status: task.status.to_string(),
        updated_at: task.updated_at.to_rfc3339(),
    }
}
