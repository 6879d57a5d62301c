//! [`Command`] for registering a new [`User`].

use common::{
    operations::{Commit, Insert, Transact, Transacted},
    DateTime,
};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for registering a new [`User`].
#[derive(Clone, Debug)]
pub struct RegisterUser {
    /// [`user::Name`] of a new [`User`].
    pub name: user::Name,

    /// [`user::Phone`] of a new [`User`].
    pub phone: user::Phone,
}

impl<Db> Command<RegisterUser> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = ExecutionError;

    async fn execute(&self, cmd: RegisterUser) -> Result<Self::Ok, Self::Err> {
        let RegisterUser { name, phone } = cmd;

        let user = User {
            id: user::Id::new(),
            name,
            phone,
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::wrap!())?;
        tx.execute(Insert(user.clone()))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`RegisterUser`] [`Command`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use crate::{
        domain::user,
        infra::Memory,
        testing::{config, service},
        Command as _,
    };

    use super::RegisterUser;

    #[tokio::test]
    async fn stores_user() {
        let (svc, _rx) = service(config(), Memory::new());

        let user = svc
            .execute(RegisterUser {
                name: user::Name::new("Asha").unwrap(),
                phone: user::Phone::new("987 654 3210").unwrap(),
            })
            .await
            .unwrap();

        let state = svc.database().snapshot().await;
        let stored = &state.users[&user.id];
        assert_eq!(stored.name, user.name);
        assert_eq!(stored.phone, user.phone);
    }
}
