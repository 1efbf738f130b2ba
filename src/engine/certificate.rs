// src/engine/certificate.rs

use crate::{
    engine::ProgressEngine,
    error::AppError,
    models::certificate::Certificate,
    notify::Notification,
    store::StoreError,
};

impl ProgressEngine {
    /// Issues the learner's certificate for a course, at most once.
    ///
    /// * An existing certificate is returned unchanged.
    /// * An incomplete course fails with `AppError::IncompleteCourse`.
    /// * When two requests race, the unique (user, course) constraint rejects
    ///   the second insert and the winner's certificate is returned instead.
    pub async fn issue_certificate_if_eligible(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Certificate, AppError> {
        if let Some(existing) = self.store.find_certificate(user_id, course_id).await? {
            return Ok(existing);
        }

        let status = self.completion_status(user_id, course_id).await?;
        if !status.is_complete {
            return Err(AppError::IncompleteCourse);
        }

        let certificate = Certificate::new(user_id, course_id);

        match self.store.insert_certificate(&certificate).await {
            Ok(()) => {
                tracing::info!(
                    user_id,
                    course_id,
                    certificate_id = %certificate.certificate_id,
                    "Certificate issued"
                );
                self.notify(Notification::CertificateIssued {
                    user_id,
                    course_id,
                    certificate_id: certificate.certificate_id.clone(),
                });
                Ok(certificate)
            }
            Err(StoreError::Conflict(_)) => {
                tracing::debug!(user_id, course_id, "Certificate issued concurrently, reusing it");
                self.store
                    .find_certificate(user_id, course_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalServerError(format!(
                            "certificate for user {} in course {} vanished after conflict",
                            user_id, course_id
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All certificates held by a learner, newest first.
    pub async fn certificates_of(&self, user_id: i64) -> Result<Vec<Certificate>, AppError> {
        Ok(self.store.list_certificates(user_id).await?)
    }

    /// Looks a certificate up by its public identifier.
    pub async fn verify_certificate(&self, certificate_id: &str) -> Result<Certificate, AppError> {
        self.store
            .find_certificate_by_id(certificate_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Certificate not found".to_string()))
    }
}
