//! Shadow target lifecycle.
//!
//! [`RenderTargets`] owns at most one shadow target and its size. It is
//! generic over the target type so the lifecycle rules hold for every
//! backend: the old target is dropped before its replacement is created,
//! `resize` works before the first `create`, and `destroy` may be called any
//! number of times.

use crate::error::Result;

#[derive(Debug)]
pub struct RenderTargets<T> {
    current: Option<T>,
    size: Option<(u32, u32)>,
}

impl<T> RenderTargets<T> {
    pub fn new() -> Self {
        Self {
            current: None,
            size: None,
        }
    }

    /// Allocate a target of `width`×`height` through `make`.
    ///
    /// An existing target is released first. If `make` fails no target is
    /// left behind and the error is returned unchanged.
    pub fn create<F>(&mut self, width: u32, height: u32, make: F) -> Result<()>
    where
        F: FnOnce(u32, u32) -> Result<T>,
    {
        self.destroy();
        let target = make(width, height)?;
        log::info!("created {width}x{height} shadow target");
        self.current = Some(target);
        self.size = Some((width, height));
        Ok(())
    }

    /// Replace the target with one of the new size.
    pub fn resize<F>(&mut self, width: u32, height: u32, make: F) -> Result<()>
    where
        F: FnOnce(u32, u32) -> Result<T>,
    {
        if self.current.is_none() {
            log::debug!("resize before the first shadow target was created");
        }
        self.create(width, height, make)
    }

    /// Release the target, if any.
    pub fn destroy(&mut self) {
        if let Some(target) = self.current.take() {
            drop(target);
            if let Some((width, height)) = self.size.take() {
                log::debug!("released {width}x{height} shadow target");
            }
        }
        self.size = None;
    }

    pub fn get(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }
}

impl<T> Default for RenderTargets<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::error::RenderError;

    struct Counted {
        size: (u32, u32),
        drops: Rc<Cell<usize>>,
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn maker(drops: &Rc<Cell<usize>>) -> impl FnOnce(u32, u32) -> Result<Counted> + '_ {
        move |width, height| {
            Ok(Counted {
                size: (width, height),
                drops: drops.clone(),
            })
        }
    }

    #[test]
    fn resize_twice_keeps_one_target_of_the_requested_size() {
        let drops = Rc::new(Cell::new(0));
        let mut targets = RenderTargets::new();
        targets.create(800, 600, maker(&drops)).unwrap();
        targets.resize(1024, 768, maker(&drops)).unwrap();
        targets.resize(1024, 768, maker(&drops)).unwrap();
        assert_eq!(drops.get(), 2);
        assert_eq!(targets.size(), Some((1024, 768)));
        assert_eq!(targets.get().map(|t| t.size), Some((1024, 768)));
    }

    #[test]
    fn old_target_is_released_before_the_new_one_is_made() {
        let drops = Rc::new(Cell::new(0));
        let mut targets = RenderTargets::new();
        targets.create(64, 64, maker(&drops)).unwrap();
        let seen = drops.clone();
        targets
            .resize(128, 128, |width, height| {
                assert_eq!(seen.get(), 1);
                Ok(Counted {
                    size: (width, height),
                    drops: seen.clone(),
                })
            })
            .unwrap();
    }

    #[test]
    fn resize_before_create_is_safe() {
        let drops = Rc::new(Cell::new(0));
        let mut targets = RenderTargets::new();
        targets.resize(320, 200, maker(&drops)).unwrap();
        assert_eq!(drops.get(), 0);
        assert_eq!(targets.size(), Some((320, 200)));
    }

    #[test]
    fn destroy_is_idempotent() {
        let drops = Rc::new(Cell::new(0));
        let mut targets: RenderTargets<Counted> = RenderTargets::new();
        targets.destroy();
        targets.create(16, 16, maker(&drops)).unwrap();
        targets.destroy();
        targets.destroy();
        assert_eq!(drops.get(), 1);
        assert!(targets.get().is_none());
        assert_eq!(targets.size(), None);
    }

    #[test]
    fn failed_creation_leaves_no_target() {
        let drops = Rc::new(Cell::new(0));
        let mut targets = RenderTargets::new();
        targets.create(16, 16, maker(&drops)).unwrap();
        let err = targets
            .resize(0, 16, |width, height| {
                Err(RenderError::IncompleteTarget {
                    width,
                    height,
                    reason: "zero sized".into(),
                })
            })
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(targets.get().is_none());
        assert_eq!(drops.get(), 1);
    }
}
