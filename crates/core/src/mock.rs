use async_trait::async_trait;
use mockall::mock;
use uuid::Uuid;

use crate::models::appointment::AppointmentStatus;
use crate::ports::{Notifier, ProfileLookup};

// Mock collaborators for testing
mock! {
    pub ProfileLookup {}

    #[async_trait]
    impl ProfileLookup for ProfileLookup {
        async fn display_name(&self, id: Uuid) -> eyre::Result<Option<String>>;
    }
}

mock! {
    pub Notifier {}

    #[async_trait]
    impl Notifier for Notifier {
        async fn notify(
            &self,
            appointment_id: Uuid,
            old_status: AppointmentStatus,
            new_status: AppointmentStatus,
        ) -> eyre::Result<()>;
    }
}
