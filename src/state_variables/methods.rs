use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::soap::UpnpErrorCode;
use crate::state_variables::{
    ChangeSender, StateVariable, StateVariableError, VariableContext,
};
use crate::value_ranges::ValueRange;
use crate::variable_types::{StateValue, StateVarType, UpnpVarType};

impl StateVariable {
    /// Crée une variable d'état.
    ///
    /// `default` est la forme textuelle du défaut déclaré (chaîne vide si la
    /// description n'en donne pas) ; elle fournit aussi la valeur initiale.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        var_type: StateVarType,
        default: &str,
        range: Option<ValueRange>,
        allowed: Option<Vec<String>>,
        to_be_evented: bool,
        to_be_multicasted: bool,
        context: VariableContext,
        changes: ChangeSender,
    ) -> Result<Self, StateVariableError> {
        let initial = if default.is_empty() {
            StateValue::zero(var_type)?
        } else {
            StateValue::parse(var_type, default)?
        };

        if let Some(range) = &range {
            if range.as_state_var_type() != var_type {
                return Err(StateVariableError::InvalidDefinition(format!(
                    "range endpoints of '{}' do not match its type {}",
                    name, var_type
                )));
            }
        }
        // exclusivité plage / liste, par genre de variable
        if range.is_some() && !var_type.is_numeric() {
            return Err(StateVariableError::InvalidDefinition(format!(
                "variable '{}' of type {} cannot carry a range",
                name, var_type
            )));
        }
        if allowed.is_some() && var_type != StateVarType::String {
            return Err(StateVariableError::InvalidDefinition(format!(
                "variable '{}' of type {} cannot carry an allowed value list",
                name, var_type
            )));
        }

        let default_value = if default.is_empty() {
            None
        } else {
            Some(initial.clone())
        };

        Ok(Self {
            name: name.trim().to_string(),
            var_type,
            value: Mutex::new(initial),
            default: default_value,
            range,
            allowed,
            to_be_evented,
            to_be_multicasted,
            context,
            changes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn var_type(&self) -> StateVarType {
        self.var_type
    }

    pub fn default_value(&self) -> Option<&StateValue> {
        self.default.as_ref()
    }

    pub fn range(&self) -> Option<&ValueRange> {
        self.range.as_ref()
    }

    pub fn allowed_values(&self) -> Option<&[String]> {
        self.allowed.as_deref()
    }

    pub fn to_be_evented(&self) -> bool {
        self.to_be_evented
    }

    pub fn to_be_multicasted(&self) -> bool {
        self.to_be_multicasted
    }

    pub fn service_id(&self) -> &str {
        &self.context.service_id
    }

    pub fn service_type(&self) -> &str {
        &self.context.service_type
    }

    pub fn service_version(&self) -> &str {
        &self.context.service_version
    }

    pub fn device_udn(&self) -> &str {
        &self.context.device_udn
    }

    /// Valeur courante (copie).
    pub fn get(&self) -> StateValue {
        self.value.lock().unwrap().clone()
    }

    /// Forme textuelle de la valeur courante.
    pub fn value_string(&self) -> String {
        self.value.lock().unwrap().to_string()
    }

    /// Verrouille la cellule et rend la garde. Le déverrouillage se fait au
    /// drop de la garde.
    pub fn lock(&self) -> MutexGuard<'_, StateValue> {
        self.value.lock().unwrap()
    }

    /// Change la valeur de la variable.
    ///
    /// Le variant doit correspondre au tag de la cellule. La mise à jour
    /// précède la notification : un abonné notifié ne peut pas relire
    /// l'ancienne valeur. Aucune notification si la valeur est inchangée.
    pub fn set(self: &Arc<Self>, v: StateValue) -> Result<(), StateVariableError> {
        self.store(v)?;
        self.notify();
        Ok(())
    }

    /// Change la valeur sans émettre de notification (initialisation,
    /// ré-hydratation du statut persisté).
    pub fn init(self: &Arc<Self>, v: StateValue) -> Result<(), StateVariableError> {
        self.store(v)?;
        Ok(())
    }

    /// Parse puis change la valeur, avec notification.
    pub fn set_from_string(self: &Arc<Self>, s: &str) -> Result<(), StateVariableError> {
        let v = StateValue::parse(self.var_type, s)?;
        self.set(v)
    }

    /// Parse puis change la valeur, sans notification.
    pub fn init_from_string(self: &Arc<Self>, s: &str) -> Result<(), StateVariableError> {
        let v = StateValue::parse(self.var_type, s)?;
        self.init(v)
    }

    fn store(&self, v: StateValue) -> Result<(), StateVariableError> {
        if !v.matches_type(self.var_type) {
            return Err(StateVariableError::TypeMismatch(format!(
                "expected {}, received {}",
                self.var_type,
                v.as_state_var_type()
            )));
        }

        let mut current = self.value.lock().unwrap();
        if *current == v {
            return Ok(());
        }
        *current = v;
        Ok(())
    }

    /// Émet un événement initial si la variable est à la fois multicastée et
    /// événementielle. Utilisé au démarrage du serveur.
    pub fn send_event(self: &Arc<Self>) {
        if self.to_be_evented && self.to_be_multicasted {
            self.notify();
        }
    }

    fn notify(self: &Arc<Self>) {
        if !self.to_be_evented && !self.to_be_multicasted {
            return;
        }
        if self.changes.try_send(Arc::clone(self)).is_err() {
            warn!(
                "change channel full, dropping change notification for '{}'",
                self.name
            );
        }
    }

    /// Valide un argument SOAP entrant contre les contraintes de la variable
    /// et construit la valeur typée correspondante.
    ///
    /// Codes d'erreur : 402 si la valeur ne se parse pas, 601 si elle sort de
    /// la plage, 600 si elle n'est pas dans la liste autorisée.
    pub fn validate_arg(&self, s: &str) -> Result<StateValue, UpnpErrorCode> {
        let v = StateValue::parse(self.var_type, s).map_err(|_| UpnpErrorCode::InvalidArgs)?;

        if let Some(range) = &self.range {
            if !range.contains(&v) {
                return Err(UpnpErrorCode::ArgValOutOfRange);
            }
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.iter().any(|a| a == s) {
                return Err(UpnpErrorCode::ArgValInvalid);
            }
        }

        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::state_variables::CHANGE_CHANNEL_CAPACITY;

    fn context() -> VariableContext {
        VariableContext {
            service_id: "CD".to_string(),
            service_type: "urn:schemas-upnp-org:service:ContentDirectory".to_string(),
            service_version: "1".to_string(),
            device_udn: "uuid:11111111-1111-1111-1111-111111111111".to_string(),
        }
    }

    fn counter(
        range: Option<ValueRange>,
    ) -> (Arc<StateVariable>, crate::state_variables::ChangeReceiver) {
        let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let sv = StateVariable::new(
            "Counter",
            StateVarType::UI4,
            "0",
            range,
            None,
            true,
            true,
            context(),
            tx,
        )
        .unwrap();
        (Arc::new(sv), rx)
    }

    #[test]
    fn test_set_rejects_wrong_kind() {
        let (sv, _rx) = counter(None);
        assert!(sv.set(StateValue::String("5".into())).is_err());
        assert!(sv.set(StateValue::UI4(5)).is_ok());
        assert_eq!(sv.value_string(), "5");
    }

    #[test]
    fn test_unchanged_value_does_not_notify() {
        let (sv, mut rx) = counter(None);
        sv.set(StateValue::UI4(7)).unwrap();
        sv.set(StateValue::UI4(7)).unwrap();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notification_carries_new_value() {
        let (sv, mut rx) = counter(None);
        sv.set(StateValue::UI4(3)).unwrap();
        let notified = rx.try_recv().unwrap();
        // la mise à jour précède la notification
        assert_eq!(notified.value_string(), "3");
    }

    #[test]
    fn test_init_is_silent() {
        let (sv, mut rx) = counter(None);
        sv.init_from_string("9").unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(sv.value_string(), "9");
    }

    #[test]
    fn test_validate_arg_range() {
        let range = ValueRange::new(&StateValue::UI4(0), &StateValue::UI4(10), None).unwrap();
        let (sv, _rx) = counter(Some(range));
        assert!(sv.validate_arg("10").is_ok());
        assert!(matches!(
            sv.validate_arg("42"),
            Err(UpnpErrorCode::ArgValOutOfRange)
        ));
        assert!(matches!(
            sv.validate_arg("abc"),
            Err(UpnpErrorCode::InvalidArgs)
        ));
    }

    #[test]
    fn test_validate_arg_allowed_list() {
        let (tx, _rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let sv = StateVariable::new(
            "TransportState",
            StateVarType::String,
            "STOPPED",
            None,
            Some(vec!["STOPPED".to_string(), "PLAYING".to_string()]),
            true,
            false,
            context(),
            tx,
        )
        .unwrap();
        assert!(sv.validate_arg("PLAYING").is_ok());
        assert!(matches!(
            sv.validate_arg("DANCING"),
            Err(UpnpErrorCode::ArgValInvalid)
        ));
    }

    #[test]
    fn test_range_on_string_rejected() {
        let (tx, _rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let range = ValueRange::new(&StateValue::UI4(0), &StateValue::UI4(1), None).unwrap();
        assert!(
            StateVariable::new(
                "Name",
                StateVarType::String,
                "",
                Some(range),
                None,
                false,
                false,
                context(),
                tx,
            )
            .is_err()
        );
    }
}
