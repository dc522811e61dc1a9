use std::any::{Any, type_name};
use std::fmt;

use crate::InvocationError;

/// Ordered, type-erased argument slots of an intercepted call.
///
/// Slot `i` corresponds to parameter `i` of the invoked
/// [`Member`](crate::Member). A slot is empty for output parameters that have
/// not been written yet, and after the target consumed it.
#[derive(Default)]
pub struct Arguments {
    slots: Vec<Option<Box<dyn Any>>>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    pub fn push<T>(&mut self, value: T)
    where
        T: 'static,
    {
        self.slots.push(Some(Box::new(value)));
    }

    /// Appends an empty slot, used for output parameters.
    pub fn push_empty(&mut self) {
        self.slots.push(None);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_set(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    pub fn get<T>(&self, index: usize) -> Result<&T, InvocationError>
    where
        T: 'static,
    {
        self.slot(index)?
            .as_ref()
            .ok_or(InvocationError::MissingArgument { index })?
            .downcast_ref()
            .ok_or(InvocationError::ArgumentType {
                index,
                expected: type_name::<T>(),
            })
    }

    pub fn get_mut<T>(&mut self, index: usize) -> Result<&mut T, InvocationError>
    where
        T: 'static,
    {
        self.slot_mut(index)?
            .as_mut()
            .ok_or(InvocationError::MissingArgument { index })?
            .downcast_mut()
            .ok_or(InvocationError::ArgumentType {
                index,
                expected: type_name::<T>(),
            })
    }

    /// Replaces the value of slot `index`.
    pub fn set<T>(&mut self, index: usize, value: T) -> Result<(), InvocationError>
    where
        T: 'static,
    {
        *self.slot_mut(index)? = Some(Box::new(value));
        Ok(())
    }

    /// Moves the value out of slot `index`, leaving it empty.
    ///
    /// On a type mismatch the slot is left untouched.
    pub fn take<T>(&mut self, index: usize) -> Result<T, InvocationError>
    where
        T: 'static,
    {
        let slot = self.slot_mut(index)?;
        match slot.take() {
            Some(value) => match value.downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(value) => {
                    *slot = Some(value);
                    Err(InvocationError::ArgumentType {
                        index,
                        expected: type_name::<T>(),
                    })
                }
            },
            None => Err(InvocationError::MissingArgument { index }),
        }
    }

    fn slot(&self, index: usize) -> Result<&Option<Box<dyn Any>>, InvocationError> {
        self.slots
            .get(index)
            .ok_or(InvocationError::ArgumentOutOfRange { index })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut Option<Box<dyn Any>>, InvocationError> {
        self.slots
            .get_mut(index)
            .ok_or(InvocationError::ArgumentOutOfRange { index })
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|v| if v.is_some() { "<set>" } else { "<empty>" }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_slots() {
        let mut args = Arguments::new();
        args.push(7u32);
        args.push(String::from("seven"));
        args.push_empty();
        assert_eq!(args.len(), 3);
        assert!(args.is_set(1));
        assert!(!args.is_set(2));

        assert_eq!(*args.get::<u32>(0).unwrap(), 7);
        *args.get_mut::<u32>(0).unwrap() += 1;
        assert_eq!(args.take::<u32>(0).unwrap(), 8);
        assert!(matches!(
            args.take::<u32>(0),
            Err(InvocationError::MissingArgument { index: 0 })
        ));

        assert!(matches!(
            args.take::<u32>(1),
            Err(InvocationError::ArgumentType { index: 1, .. })
        ));
        assert_eq!(args.get::<String>(1).unwrap(), "seven");

        args.set(2, 3i64).unwrap();
        assert_eq!(*args.get::<i64>(2).unwrap(), 3);
        assert!(matches!(
            args.set(5, 0u8),
            Err(InvocationError::ArgumentOutOfRange { index: 5 })
        ));
    }
}
