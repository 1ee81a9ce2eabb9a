//! Construction du modèle runtime depuis les descriptions.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::desc;
use crate::model::{DeviceNode, DeviceTree, ModelError, Service, ServiceMap};
use crate::state_variables::{ChangeSender, StateVariable, VariableContext};
use crate::value_ranges::ValueRange;
use crate::variable_types::{StateValue, StateVarType, UpnpVarType};

/// Construit l'arena de devices et le registre de services depuis une
/// description de root device et les SCPD associées.
///
/// Les clés de `svc_descs` doivent correspondre aux parties finales des ids
/// de service de la description du device.
pub fn build(
    root: &desc::RootDevice,
    svc_descs: &desc::ServiceMap,
    changes: ChangeSender,
) -> Result<(DeviceTree, ServiceMap), ModelError> {
    let mut tree = DeviceTree::default();
    let mut services = ServiceMap::new();

    build_device(&root.device, svc_descs, &changes, &mut tree, &mut services)?;

    debug!(
        "model built: {} device(s), {} service(s)",
        tree.len(),
        services.len()
    );

    Ok((tree, services))
}

/// Crée le nœud d'un device et descend récursivement dans les devices
/// embarqués. Retourne l'index du nœud créé.
fn build_device(
    dvc: &desc::Device,
    svc_descs: &desc::ServiceMap,
    changes: &ChangeSender,
    tree: &mut DeviceTree,
    services: &mut ServiceMap,
) -> Result<usize, ModelError> {
    let index = tree.nodes.len();
    tree.nodes.push(DeviceNode {
        udn: dvc.udn.clone(),
        device_type: dvc.device_type.clone(),
        friendly_name: dvc.friendly_name.clone(),
        services: Vec::new(),
        children: Vec::new(),
    });

    for svc_ref in &dvc.services {
        let tail = svc_ref.id_tail().to_string();

        if services.contains_key(&tail) {
            return Err(ModelError::DuplicateService(tail));
        }
        let svc_desc = svc_descs
            .get(&tail)
            .ok_or_else(|| ModelError::UnknownService(tail.clone()))?;

        let service = build_service(svc_ref, svc_desc, &dvc.udn, index, changes)?;
        tree.nodes[index].services.push(tail.clone());
        services.insert(tail, Arc::new(service));
    }

    for sub in &dvc.devices {
        let child = build_device(sub, svc_descs, changes, tree, services)?;
        tree.nodes[index].children.push(child);
    }

    Ok(index)
}

fn build_service(
    svc_ref: &desc::ServiceReference,
    svc_desc: &desc::Service,
    udn: &str,
    device: usize,
    changes: &ChangeSender,
) -> Result<Service, ModelError> {
    let id = svc_ref.id_tail().to_string();
    let service_type = svc_ref.type_prefix();
    let version = svc_ref.type_version();

    // variables d'état
    let mut state_vars: HashMap<String, Arc<StateVariable>> = HashMap::new();
    for sv in &svc_desc.state_table {
        let var_type = StateVarType::from_str(&sv.data_type)?;

        let range = match &sv.allowed_range {
            Some(r) if var_type.is_numeric() => {
                let min = StateValue::parse(var_type, &r.minimum)?;
                let max = StateValue::parse(var_type, &r.maximum)?;
                let step = if r.step.is_empty() {
                    None
                } else {
                    Some(StateValue::parse(var_type, &r.step)?)
                };
                Some(ValueRange::new(&min, &max, step.as_ref())?)
            }
            _ => None,
        };

        let allowed = if sv.allowed_values.is_empty() {
            None
        } else {
            Some(sv.allowed_values.clone())
        };

        let context = VariableContext {
            service_id: id.clone(),
            service_type: service_type.clone(),
            service_version: version.clone(),
            device_udn: udn.to_string(),
        };

        let variable = StateVariable::new(
            &sv.name,
            var_type,
            &sv.default_value,
            range,
            allowed,
            sv.send_events,
            sv.multicast,
            context,
            changes.clone(),
        )?;
        state_vars.insert(variable.name().to_string(), Arc::new(variable));
    }

    // actions : seule la table des arguments d'entrée est conservée,
    // résolue vers les variables d'état du même service
    let mut act_specs = HashMap::new();
    for act in &svc_desc.actions {
        if act_specs.contains_key(&act.name) {
            return Err(ModelError::DuplicateAction(act.name.clone()));
        }

        let mut args = HashMap::new();
        for arg in &act.arguments {
            if arg.direction != "in" {
                continue;
            }
            let sv = state_vars
                .get(&arg.related_state_variable)
                .ok_or_else(|| ModelError::DanglingArgument {
                    action: act.name.clone(),
                    arg: arg.name.clone(),
                    var: arg.related_state_variable.clone(),
                })?;
            args.insert(arg.name.clone(), Arc::clone(sv));
        }
        act_specs.insert(act.name.clone(), args);
    }

    Ok(Service {
        id,
        service_type,
        version,
        device,
        state_vars,
        act_specs,
        desc: svc_desc.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::desc::fixtures;
    use crate::state_variables::CHANGE_CHANNEL_CAPACITY;

    fn built() -> (DeviceTree, ServiceMap) {
        let (tx, _rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        build(&fixtures::root_device(), &fixtures::service_map(), tx).unwrap()
    }

    #[test]
    fn test_build_tree_and_services() {
        let (tree, services) = built();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().services, vec!["CD".to_string()]);

        let cd = services.get("CD").unwrap();
        assert_eq!(cd.id(), "CD");
        assert_eq!(
            cd.service_type(),
            "urn:schemas-upnp-org:service:ContentDirectory"
        );
        assert_eq!(cd.version(), "3");
        assert_eq!(cd.device_index(), 0);
        assert!(cd.state_var("Counter").is_some());
    }

    #[test]
    fn test_action_spec_holds_input_args_only() {
        let (_, services) = built();
        let cd = services.get("CD").unwrap();
        let spec = cd.action_spec("SetCounter").unwrap();
        assert!(spec.contains_key("Value"));
        assert_eq!(spec.len(), 1);
    }

    #[test]
    fn test_unknown_service_is_an_error() {
        let (tx, _rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let root = fixtures::root_device();
        let empty = desc::ServiceMap::new();
        assert!(matches!(
            build(&root, &empty, tx),
            Err(ModelError::UnknownService(id)) if id == "CD"
        ));
    }

    #[test]
    fn test_duplicate_service_is_an_error() {
        let (tx, _rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let mut root = fixtures::root_device();
        let dup = root.device.services[0].clone();
        root.device.services.push(dup);
        assert!(matches!(
            build(&root, &fixtures::service_map(), tx),
            Err(ModelError::DuplicateService(id)) if id == "CD"
        ));
    }

    #[test]
    fn test_dangling_argument_is_an_error() {
        let (tx, _rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let root = fixtures::root_device();
        let mut descs = fixtures::service_map();
        descs.get_mut("CD").unwrap().actions[0].arguments[0].related_state_variable =
            "Nonexistent".to_string();
        assert!(matches!(
            build(&root, &descs, tx),
            Err(ModelError::DanglingArgument { .. })
        ));
    }
}
