//! Conversion of caller-supplied statement arguments.
//!
//! Arguments to raw SQL (`load_rows`, `execute_non_query`, keyed loads) are
//! passed as `&dyn BindArg`. The [`BindRegistry`] looks up a binder by the
//! argument's concrete type; types without a binder are bound as their
//! `Debug` text.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, Utc};
use objectsql_core::{CoercionError, HostValue, TypeOptions, Value, coerce};
use uuid::Uuid;

use crate::error::{Result, SqliteError};

/// A value usable as a statement argument.
pub trait BindArg: Any + Send + Sync {
    /// The argument as `Any`, for binder lookup.
    fn as_any(&self) -> &dyn Any;

    /// Text bound when no binder is registered for the type.
    fn fallback_text(&self) -> String;
}

impl<T: Any + Send + Sync + fmt::Debug> BindArg for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn fallback_text(&self) -> String {
        format!("{self:?}")
    }
}

type Binder = Arc<dyn Fn(&dyn Any, &TypeOptions) -> std::result::Result<Value, CoercionError> + Send + Sync>;

/// Maps argument types to binders.
///
/// Lookups and registrations may race from several threads; the first
/// binder registered for a type is kept.
pub struct BindRegistry {
    binders: RwLock<HashMap<TypeId, Binder>>,
}

impl fmt::Debug for BindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.binders.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("BindRegistry").field("binders", &count).finish()
    }
}

impl Default for BindRegistry {
    fn default() -> Self {
        let registry = Self {
            binders: RwLock::new(HashMap::new()),
        };
        registry.register_host::<bool>();
        registry.register_host::<i8>();
        registry.register_host::<i16>();
        registry.register_host::<i32>();
        registry.register_host::<i64>();
        registry.register_host::<u8>();
        registry.register_host::<u16>();
        registry.register_host::<u32>();
        registry.register_host::<u64>();
        registry.register_host::<f32>();
        registry.register_host::<String>();
        registry.register_host::<rust_decimal::Decimal>();
        registry.register_host::<Uuid>();
        registry.register_host::<DateTime<Utc>>();
        registry.register_host::<DateTime<FixedOffset>>();
        registry.register_host::<TimeDelta>();
        registry.register_host::<Vec<u8>>();
        registry.register::<f64, _>(|v, _| bind_f64(*v));
        registry.register::<Option<f64>, _>(|v, _| v.map_or(Ok(Value::Null), bind_f64));
        registry.register::<&'static str, _>(|v, _| Ok(Value::Text((*v).to_string())));
        registry.register::<NaiveDateTime, _>(|v, options| {
            Ok(coerce::to_storage(&HostValue::DateTime(v.and_utc()), options))
        });
        registry.register::<Value, _>(|v, _| Ok(v.clone()));
        registry.register::<HostValue, _>(|v, options| Ok(coerce::to_storage(v, options)));
        registry
    }
}

impl BindRegistry {
    /// Registers a binder for `T` unless one exists. Returns `true` when
    /// this binder was stored.
    pub fn register<T, F>(&self, bind: F) -> bool
    where
        T: Any,
        F: Fn(&T, &TypeOptions) -> std::result::Result<Value, CoercionError> + Send + Sync + 'static,
    {
        let binder: Binder = Arc::new(move |arg: &dyn Any, options: &TypeOptions| {
            match arg.downcast_ref::<T>() {
                Some(value) => bind(value, options),
                None => Err(CoercionError::new("argument", std::any::type_name::<T>())),
            }
        });
        let mut binders = self.binders.write().unwrap_or_else(PoisonError::into_inner);
        let mut stored = false;
        binders.entry(TypeId::of::<T>()).or_insert_with(|| {
            stored = true;
            binder
        });
        stored
    }

    /// Registers `T` and `Option<T>` through their typed value.
    fn register_host<T>(&self)
    where
        T: Any + Clone + Into<HostValue>,
    {
        self.register::<T, _>(|v, options| Ok(coerce::to_storage(&v.clone().into(), options)));
        self.register::<Option<T>, _>(|v, options| Ok(coerce::to_storage(&v.clone().into(), options)));
    }

    /// Whether a binder exists for `T`.
    pub fn contains<T: Any>(&self) -> bool {
        self.binders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    /// Converts one argument. `index` is 1-based and only used in errors.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Bind`] when the registered binder rejects the
    /// value.
    pub fn bind(&self, index: usize, arg: &dyn BindArg, options: &TypeOptions) -> Result<Value> {
        let any = arg.as_any();
        let binder = self
            .binders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&any.type_id())
            .cloned();
        match binder {
            Some(binder) => binder(any, options).map_err(|err| SqliteError::Bind {
                index,
                reason: err.to_string(),
            }),
            None => Ok(Value::Text(arg.fallback_text())),
        }
    }

    /// Converts all arguments in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`SqliteError::Bind`] raised.
    pub fn bind_all(&self, args: &[&dyn BindArg], options: &TypeOptions) -> Result<Vec<Value>> {
        args.iter()
            .enumerate()
            .map(|(i, arg)| self.bind(i + 1, *arg, options))
            .collect()
    }
}

fn bind_f64(v: f64) -> std::result::Result<Value, CoercionError> {
    if v.is_nan() {
        Err(CoercionError::new("f64 NaN", "REAL"))
    } else {
        Ok(Value::Real(v))
    }
}

#[cfg(test)]
mod tests {
    use objectsql_core::DateTimeFormat;

    use super::*;

    struct Point(i32, i32);

    impl fmt::Debug for Point {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{};{}", self.0, self.1)
        }
    }

    #[test]
    fn test_builtin_binders() {
        let registry = BindRegistry::default();
        let options = TypeOptions {
            date_time_format: DateTimeFormat::UnixTimeSeconds,
            ..TypeOptions::default()
        };
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let values = registry
            .bind_all(&[&42i32, &"name", &true, &at, &Value::Null], &options)
            .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Integer(42),
                Value::from("name"),
                Value::Integer(1),
                Value::Integer(1_700_000_000),
                Value::Null,
            ]
        );
    }

    #[test]
    fn test_bytes_and_optional_arguments() {
        let registry = BindRegistry::default();
        let none: Option<i32> = None;
        let values = registry
            .bind_all(
                &[&vec![1u8, 2], &Some(7i64), &none, &Some(String::from("x")), &Some(0.5f64)],
                &TypeOptions::default(),
            )
            .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Blob(vec![1, 2]),
                Value::Integer(7),
                Value::Null,
                Value::from("x"),
                Value::Real(0.5),
            ]
        );
        assert!(registry.contains::<Option<Uuid>>());
    }

    #[test]
    fn test_unregistered_type_falls_back_to_text() {
        let registry = BindRegistry::default();
        let value = registry.bind(1, &Point(3, 4), &TypeOptions::default()).unwrap();
        assert_eq!(value, Value::from("3;4"));
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = BindRegistry::default();
        assert!(!registry.register::<i32, _>(|_, _| Ok(Value::Null)));
        assert!(registry.register::<Point, _>(|p, _| Ok(Value::Integer(i64::from(p.0)))));
        assert!(!registry.register::<Point, _>(|_, _| Ok(Value::Null)));
        let value = registry.bind(1, &Point(3, 4), &TypeOptions::default()).unwrap();
        assert_eq!(value, Value::Integer(3));
        assert_eq!(
            registry.bind(1, &42i32, &TypeOptions::default()).unwrap(),
            Value::Integer(42)
        );
    }

    #[test]
    fn test_nan_is_a_bind_error() {
        let registry = BindRegistry::default();
        let err = registry
            .bind_all(&[&1i64, &f64::NAN], &TypeOptions::default())
            .unwrap_err();
        assert!(matches!(err, SqliteError::Bind { index: 2, .. }));
    }
}
