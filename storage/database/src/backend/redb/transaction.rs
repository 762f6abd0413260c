//! Implementation of `trait TxRo/TxRw` for `redb`.

//---------------------------------------------------------------------------------------------------- Import
use crate::{
    error::RuntimeError,
    transaction::{TxRo, TxRw},
};

//---------------------------------------------------------------------------------------------------- TxRo
impl TxRo<'_> for redb::ReadTransaction {
    fn commit(self) -> Result<(), RuntimeError> {
        Ok(self.close()?)
    }
}

//---------------------------------------------------------------------------------------------------- TxRw
impl TxRw<'_> for redb::WriteTransaction {
    fn commit(self) -> Result<(), RuntimeError> {
        Ok(self.commit()?)
    }

    fn abort(self) -> Result<(), RuntimeError> {
        Ok(self.abort()?)
    }
}
