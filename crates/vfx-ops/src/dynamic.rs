//! Dynamic properties: values that may change after a processor is built.
//!
//! A dynamic property is a shared slot (`Arc<RwLock<_>>`). CPU renderers
//! read the slot on every apply and shader uniform getters read it at bind
//! time, so updating the value never requires rebuilding either side.
//!
//! The [`DynamicRegistry`] owned by a pipeline holds one slot per
//! [`DynamicPropertyType`]; every op bound to the same type shares it.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;
use vfx_shader::DynamicPropertyType;

use crate::OpsResult;
use crate::curve::KnotsCoefs;

// ============================================================================
// Curve slots
// ============================================================================

/// A set of curves that can live in a dynamic slot.
pub trait CurveSet: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Property the curve set is bound to.
    const PROPERTY: DynamicPropertyType;

    /// Validates the curves and packs them for evaluation.
    fn pack(&self) -> OpsResult<KnotsCoefs>;
}

#[derive(Debug)]
struct CurveState<C> {
    curves: C,
    knots_coefs: KnotsCoefs,
}

/// Shared, updatable curve set.
#[derive(Debug, Clone)]
pub struct DynamicCurve<C: CurveSet> {
    inner: Arc<RwLock<CurveState<C>>>,
}

impl<C: CurveSet> DynamicCurve<C> {
    /// New slot holding `curves`.
    pub fn new(curves: C) -> OpsResult<Self> {
        let knots_coefs = curves.pack()?;
        Ok(Self { inner: Arc::new(RwLock::new(CurveState { curves, knots_coefs })) })
    }

    /// Current curves.
    pub fn curves(&self) -> C {
        self.read(|s| s.curves.clone())
    }

    /// Replaces the curves. The slot is left unchanged on error.
    pub fn set(&self, curves: C) -> OpsResult<()> {
        let knots_coefs = curves.pack()?;
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.curves = curves;
        guard.knots_coefs = knots_coefs;
        debug!(property = %C::PROPERTY, "Updated dynamic curves");
        Ok(())
    }

    /// Copy of the packed curves.
    pub fn knots_coefs(&self) -> KnotsCoefs {
        self.read(|s| s.knots_coefs.clone())
    }

    /// Runs `f` on the packed curves under the read lock.
    pub fn with_knots_coefs<R>(&self, f: impl FnOnce(&KnotsCoefs) -> R) -> R {
        self.read(|s| f(&s.knots_coefs))
    }

    /// True while every curve is the identity; shaders skip the op body.
    pub fn local_bypass(&self) -> bool {
        self.read(|s| s.knots_coefs.is_identity())
    }

    /// True when both handles point at the same slot.
    pub fn same_slot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn read<R>(&self, f: impl FnOnce(&CurveState<C>) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Dynamic slots of one pipeline, one per property type.
#[derive(Debug, Clone, Default)]
pub struct DynamicRegistry {
    rgb_curve: Option<crate::DynamicRgbCurve>,
    hue_curve: Option<crate::DynamicHueCurve>,
}

impl DynamicRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// RGB curve slot, if bound.
    pub fn rgb_curve(&self) -> Option<&crate::DynamicRgbCurve> {
        self.rgb_curve.as_ref()
    }

    /// Binds `slot` as the RGB curve slot, or returns the one already bound.
    pub fn bind_rgb_curve(&mut self, slot: crate::DynamicRgbCurve) -> crate::DynamicRgbCurve {
        self.rgb_curve.get_or_insert(slot).clone()
    }

    /// Hue curve slot, if bound.
    pub fn hue_curve(&self) -> Option<&crate::DynamicHueCurve> {
        self.hue_curve.as_ref()
    }

    /// Binds `slot` as the hue curve slot, or returns the one already bound.
    pub fn bind_hue_curve(&mut self, slot: crate::DynamicHueCurve) -> crate::DynamicHueCurve {
        self.hue_curve.get_or_insert(slot).clone()
    }

    /// True if `property` has a slot.
    pub fn has(&self, property: DynamicPropertyType) -> bool {
        match property {
            DynamicPropertyType::GradingRgbCurve => self.rgb_curve.is_some(),
            DynamicPropertyType::GradingHueCurve => self.hue_curve.is_some(),
        }
    }

    /// Bound properties.
    pub fn properties(&self) -> Vec<DynamicPropertyType> {
        let mut v = Vec::with_capacity(2);
        if self.rgb_curve.is_some() {
            v.push(DynamicPropertyType::GradingRgbCurve);
        }
        if self.hue_curve.is_some() {
            v.push(DynamicPropertyType::GradingHueCurve);
        }
        v
    }

    /// Drops every slot.
    pub fn clear(&mut self) {
        self.rgb_curve = None;
        self.hue_curve = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::BSplineCurve;
    use crate::data::{GradingStyle, RgbCurves};

    #[test]
    fn test_curve_slot_update() {
        let slot = crate::DynamicRgbCurve::new(RgbCurves::default_for(GradingStyle::Log)).unwrap();
        assert!(slot.local_bypass());

        let mut curves = slot.curves();
        curves.master = BSplineCurve::from_points(&[(0.0, 0.0), (0.5, 0.7), (1.0, 1.0)]);
        slot.set(curves).unwrap();
        assert!(!slot.local_bypass());
        assert!(slot.with_knots_coefs(|kc| kc.eval(3, 0.5) > 0.69));
    }

    #[test]
    fn test_invalid_update_keeps_value() {
        let slot = crate::DynamicRgbCurve::new(RgbCurves::default_for(GradingStyle::Log)).unwrap();
        let mut curves = slot.curves();
        curves.red = BSplineCurve::from_points(&[(0.5, 0.0), (0.2, 1.0)]);
        assert!(slot.set(curves).is_err());
        assert!(slot.local_bypass());
    }

    #[test]
    fn test_registry_unifies_curve_slots() {
        let mut reg = DynamicRegistry::new();
        let first = crate::DynamicRgbCurve::new(RgbCurves::default_for(GradingStyle::Log)).unwrap();
        let second = crate::DynamicRgbCurve::new(RgbCurves::default_for(GradingStyle::Log)).unwrap();
        let a = reg.bind_rgb_curve(first.clone());
        let b = reg.bind_rgb_curve(second);
        assert!(a.same_slot(&first));
        assert!(b.same_slot(&first));
        assert_eq!(reg.properties(), vec![DynamicPropertyType::GradingRgbCurve]);
        assert!(reg.has(DynamicPropertyType::GradingRgbCurve));
        assert!(!reg.has(DynamicPropertyType::GradingHueCurve));

        reg.clear();
        assert!(reg.properties().is_empty());
    }
}
