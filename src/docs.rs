use utoipa::OpenApi;
use utoipa::Modify;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::scheduler::handler::trigger_publish,
        crate::modules::scheduler::handler::manual_publish,
        crate::modules::scheduler::handler::trigger_poll,
        crate::modules::scheduler::handler::manual_poll,
        crate::modules::content::handler::create_content,
        crate::modules::content::handler::list_contents,
        crate::modules::content::handler::get_content,
        crate::modules::content::handler::list_content_jobs,
        crate::modules::content::handler::retry_content,
        crate::modules::publish::handler::publish_now,
        crate::modules::media::handler::upload_media,
    ),
    components(
        schemas(
            crate::common::response::ErrorBody,
            crate::modules::scheduler::dto::TriggerRequest,
            crate::modules::scheduler::dto::DispatchSummary,
            crate::modules::scheduler::dto::PollSummary,
            crate::modules::content::model::Content,
            crate::modules::content::model::ContentOptions,
            crate::modules::content::model::ContentStatus,
            crate::modules::content::model::Platform,
            crate::modules::content::model::PrivacyStatus,
            crate::modules::content::dto::CreateContentRequest,
            crate::modules::content::dto::PublishResponse,
            crate::modules::publish_job::model::PublishJob,
            crate::modules::publish_job::model::PublishJobStatus,
            crate::modules::publish_job::model::JobResult,
            crate::modules::publish_job::model::JobMetadata,
            crate::modules::publish::dto::DirectPublishRequest,
            crate::modules::media::handler::UploadedMedia,
        )
    ),
    tags(
        (name = "Scheduler", description = "Trigger endpoints for the publish dispatcher and the Instagram poller"),
        (name = "Content", description = "Scheduled content management"),
        (name = "Publish", description = "Immediate publishing"),
        (name = "Media", description = "Media uploads")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "cron_secret",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_trigger_and_retry_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/cron/publish"));
        assert!(doc.paths.paths.contains_key("/api/v1/cron/instagram-poll"));
        assert!(doc.paths.paths.contains_key("/api/v1/contents/{id}/retry"));
    }
}
