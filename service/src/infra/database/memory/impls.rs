//! [`Database`] implementations.

use common::operations::{
    By, Claim, Commit, Consume, Delete, Insert, Lock, Select, Transact, Update,
};
use tracerr::Traced;

use crate::{
    domain::{
        release_token, slot, user, vehicle, ReleaseToken, Slot, User, Vehicle,
    },
    infra::{database, Database},
    read,
};

use super::{Memory, NonTx, Storage, Tx};

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(Tx::begin(&self.0).await))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Insert<slot::PoolSize>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(size): Insert<slot::PoolSize>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            for id in size.ids() {
                _ = s.slots.entry(id).or_insert(Slot::vacant(id));
            }
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Select<By<Option<Slot>, slot::Id>>> for Memory<C> {
    type Ok = Option<Slot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Slot>, slot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.slots.get(&id).copied())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Select<By<Vec<Slot>, read::slot::list::Filter>>>
    for Memory<C>
{
    type Ok = Vec<Slot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Slot>, read::slot::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        self.read(|s| {
            s.slots
                .values()
                .filter(|slot| filter.matches(slot))
                .copied()
                .collect()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Claim<By<Option<slot::Id>, vehicle::Id>>>
    for Memory<C>
{
    type Ok = Option<slot::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Claim(by): Claim<By<Option<slot::Id>, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let vehicle_id = by.into_inner();
        self.write(|s| {
            let slot = s.slots.values_mut().find(|slot| !slot.is_occupied())?;
            slot.vehicle_id = Some(vehicle_id);
            Some(slot.id)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Claim<Slot>> for Memory<C> {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Claim(slot): Claim<Slot>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| match s.slots.get_mut(&slot.id) {
            Some(stored) if !stored.is_occupied() => {
                *stored = slot;
                true
            }
            _ => false,
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Lock<By<Slot, slot::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Slot, slot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl<C: Storage> Database<Update<Slot>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(slot): Update<Slot>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            if let Some(stored) = s.slots.get_mut(&slot.id) {
                *stored = slot;
            }
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Select<By<Option<User>, user::Id>>> for Memory<C> {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.users.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Insert<User>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            _ = s.users.insert(user.id, user);
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Select<By<Option<Vehicle>, vehicle::Id>>>
    for Memory<C>
{
    type Ok = Option<Vehicle>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Vehicle>, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.vehicles.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Insert<Vehicle>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(vehicle): Insert<Vehicle>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            _ = s.vehicles.insert(vehicle.id, vehicle);
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Lock<By<Vehicle, vehicle::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Vehicle, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl<C: Storage> Database<Delete<By<Vehicle, vehicle::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Vehicle, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.write(|s| {
            _ = s.vehicles.remove(&id);
            s.release_tokens.retain(|_, t| t.vehicle_id != id);
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Insert<ReleaseToken>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(token): Insert<ReleaseToken>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            _ = s.release_tokens.insert(token.id, token);
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Select<By<Option<ReleaseToken>, release_token::Id>>>
    for Memory<C>
{
    type Ok = Option<ReleaseToken>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<ReleaseToken>, release_token::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.release_tokens.get(&id).copied())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Storage>
    Database<
        Select<By<Option<ReleaseToken>, read::release_token::Outstanding>>,
    > for Memory<C>
{
    type Ok = Option<ReleaseToken>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<ReleaseToken>, read::release_token::Outstanding>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::release_token::Outstanding {
            vehicle_id,
            slot_id,
        } = by.into_inner();
        self.read(|s| {
            s.release_tokens
                .values()
                .filter(|t| {
                    t.vehicle_id == vehicle_id
                        && t.slot_id == slot_id
                        && t.is_active()
                })
                .max_by_key(|t| t.expires_at)
                .copied()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage>
    Database<Consume<By<Option<ReleaseToken>, release_token::Id>>>
    for Memory<C>
{
    type Ok = Option<ReleaseToken>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Consume(by): Consume<By<Option<ReleaseToken>, release_token::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.write(|s| {
            let token = s
                .release_tokens
                .get_mut(&id)
                .filter(|t| t.is_active())?;
            token.used = true;
            Some(*token)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Consume<By<Vec<ReleaseToken>, vehicle::Id>>>
    for Memory<C>
{
    type Ok = Vec<ReleaseToken>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Consume(by): Consume<By<Vec<ReleaseToken>, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let vehicle_id = by.into_inner();
        self.write(|s| {
            s.release_tokens
                .values_mut()
                .filter(|t| t.vehicle_id == vehicle_id && !t.used)
                .map(|t| {
                    t.used = true;
                    *t
                })
                .collect()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Storage>
    Database<Delete<By<ReleaseToken, release_token::ExpirationDateTime>>>
    for Memory<C>
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<
            By<ReleaseToken, release_token::ExpirationDateTime>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let expired_before = by.into_inner();
        self.write(|s| {
            let before = s.release_tokens.len();
            s.release_tokens.retain(|_, t| t.expires_at >= expired_before);
            u64::try_from(before - s.release_tokens.len()).unwrap_or(u64::MAX)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}
