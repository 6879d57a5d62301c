//! [`Command`] for seeding the pool of [`Slot`]s.

use common::operations::Insert;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Slot;
use crate::{
    domain::slot,
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for seeding the pool of [`Slot`]s.
///
/// Creates the missing [`Slot`]s with IDs from `1` to the provided
/// [`slot::PoolSize`], leaving the existing ones untouched, so it's safe to
/// execute it on every startup.
#[derive(Clone, Copy, Debug)]
pub struct EnsureSlots {
    /// Number of [`Slot`]s in the pool.
    pub count: slot::PoolSize,
}

impl<Db> Command<EnsureSlots> for Service<Db>
where
    Db: Database<Insert<slot::PoolSize>, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(
        &self,
        EnsureSlots { count }: EnsureSlots,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Insert(count))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Error of [`EnsureSlots`] [`Command`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use crate::{
        domain::slot,
        infra::Memory,
        testing::{config, service},
        Command as _,
    };

    use super::EnsureSlots;

    #[tokio::test]
    async fn seeds_requested_number_of_slots() {
        let (svc, _) = service(config(), Memory::new());

        svc.execute(EnsureSlots {
            count: slot::PoolSize::from(3),
        })
        .await
        .unwrap();
        svc.execute(EnsureSlots {
            count: slot::PoolSize::from(3),
        })
        .await
        .unwrap();

        let slots = svc.database().snapshot().await.slots;
        assert_eq!(
            slots.keys().copied().collect::<Vec<_>>(),
            slot::PoolSize::from(3).ids().collect::<Vec<_>>(),
        );
        assert!(slots.values().all(|s| !s.is_occupied()));
    }
}
