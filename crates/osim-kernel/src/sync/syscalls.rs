use log::{info, warn};

use crate::error::KernelError;
use crate::peer::{ComputeUnit, MemoryService};
use crate::sync::LockOutcome;
use crate::types::ThreadId;
use crate::Kernel;

impl<M: MemoryService, C: ComputeUnit> Kernel<M, C> {
    pub(crate) async fn mutex_create(&self, caller: ThreadId, name: &str) -> Result<(), KernelError> {
        let created = self.state.lock().create_mutex(caller.pid, name);
        if created.is_ok() {
            info!("{} - created mutex {:?}", caller, name);
        }
        self.resume(caller).await?;
        created
    }

    pub(crate) async fn mutex_lock(&self, caller: ThreadId, name: &str) -> Result<(), KernelError> {
        let locked = self.transact(|state| state.lock_mutex(caller, name)).await;
        match locked {
            Ok(LockOutcome::Blocked) => Ok(()),
            Ok(LockOutcome::Acquired | LockOutcome::Missing) => self.resume(caller).await,
            Err(err) => {
                self.resume(caller).await?;
                Err(err)
            }
        }
    }

    pub(crate) async fn mutex_unlock(&self, caller: ThreadId, name: &str) -> Result<(), KernelError> {
        let released = self.transact(|state| state.unlock_mutex(caller, name)).await;
        match &released {
            Ok(Some(next)) => info!("{} - mutex {:?} handed to {}", caller, name, next),
            Ok(None) => info!("{} - released mutex {:?}", caller, name),
            Err(err) => warn!("{} - unlock of {:?} rejected: {}", caller, name, err),
        }
        self.resume(caller).await?;
        released.map(|_| ())
    }
}
