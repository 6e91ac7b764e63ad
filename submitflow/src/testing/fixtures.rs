//! Sample forms, payloads and purchase settings.

use serde_json::json;

use crate::config::{
    ActionSpec, FieldDefinition, FormDefinition, PipelineConfig, PurchaseAuthConfig, SubmitAction,
};
use crate::context::SubmissionPayload;
use crate::template::TemplateContext;

/// Form id used by the fixtures.
pub const SAMPLE_FORM_ID: &str = "car-listing";

/// A three-field form with English and Arabic labels and no submit block.
#[must_use]
pub fn sample_form() -> FormDefinition {
    FormDefinition::new(SAMPLE_FORM_ID, 3)
        .with_field(
            FieldDefinition::new("name")
                .with_label("en", "Full name")
                .with_label("ar", "الاسم الكامل"),
        )
        .with_field(FieldDefinition::new("phone").with_label("en", "Phone"))
        .with_field(FieldDefinition::new("location").with_label("en", "Location"))
}

/// `sample_form` with `submit` set to `pipeline`.
#[must_use]
pub fn sample_form_with(pipeline: PipelineConfig) -> FormDefinition {
    sample_form().with_submit(pipeline)
}

/// A payload answering every field of `sample_form`.
#[must_use]
pub fn sample_payload() -> SubmissionPayload {
    SubmissionPayload::new(SAMPLE_FORM_ID, 3)
        .with_submitted_at(1_700_000_000_000)
        .with_answer("name", "Sara Ali")
        .with_answer("phone", json!({"e164": "+96550000000", "country": "KW"}))
        .with_answer("location", json!({"lat": 29.375_859, "lng": 47.977_405}))
        .with_answer("adv_id", json!({"value": "4411"}))
        .with_answer("item_id", "5_days")
        .with_meta("locale", "en")
        .with_meta("sessionId", "sess-42")
}

/// Purchase settings that skip authentication.
#[must_use]
pub fn sample_purchase_config() -> PurchaseAuthConfig {
    PurchaseAuthConfig::new().with_purchase_api_url("https://market.example/v1/purchase")
}

/// An enabled purchase action using `config`.
#[must_use]
pub fn purchase_action(config: PurchaseAuthConfig) -> SubmitAction {
    SubmitAction::enabled(ActionSpec::PurchaseAuthenticated {
        purchase_auth_config: Some(config),
    })
}

/// An enabled redirect action.
#[must_use]
pub fn redirect_action(url: &str) -> SubmitAction {
    SubmitAction::enabled(ActionSpec::Redirect {
        url: Some(url.to_string()),
    })
}

/// A template context shaped like a redirect context.
#[must_use]
pub fn sample_template_context() -> TemplateContext {
    let mut context = TemplateContext::new();
    context.insert("submissionId".into(), json!(29));
    context.insert("formId".into(), json!(SAMPLE_FORM_ID));
    context.insert("name".into(), json!("Sara Ali"));
    context.insert("phone".into(), json!({"e164": "+96550000000"}));
    context.insert(
        "meta".into(),
        json!({"locale": "en", "utm": {"source": "newsletter"}}),
    );
    context
}
