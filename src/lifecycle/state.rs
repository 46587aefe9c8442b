use std::sync::atomic::{AtomicU8, Ordering};

use strum_macros::Display;

/// Состояние процесса в его жизненном цикле.
///
/// Переходы только вперёд: Starting → Running → ShuttingDown → Stopped.
/// Неудачный запуск переходит из Starting сразу в ShuttingDown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[repr(u8)]
pub enum LifecycleState {
    Starting = 0,
    Running = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::ShuttingDown,
            _ => Self::Stopped,
        }
    }

    /// Разрешён ли переход `self -> next`.
    pub fn can_advance_to(
        self,
        next: LifecycleState,
    ) -> bool {
        matches!(
            (self, next),
            (Self::Starting, Self::Running)
                | (Self::Starting, Self::ShuttingDown)
                | (Self::Running, Self::ShuttingDown)
                | (Self::ShuttingDown, Self::Stopped)
        )
    }
}

/// Атомарная ячейка с текущим состоянием.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Starting as u8))
    }

    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Переводит ячейку в `next`, если переход разрешён.
    ///
    /// # Возвращает
    /// - `true`, если состояние изменилось
    pub fn advance(
        &self,
        next: LifecycleState,
    ) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if !LifecycleState::from_u8(current).can_advance_to(next) {
                return false;
            }
            match self.0.compare_exchange(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
