use js_sys::{Object, Reflect};
use wasm_bindgen::JsValue;
use web_sys::Url;
use worker_bootstrap::{
    MessageKind, ModuleSource, PoolInitMessage, ReadinessSignal, WorkerMessage,
};

use super::handles::WebHandles;

const TYPE: &str = "type";

/// Encodes a launcher→worker message as the plain object `js/worker.js` reads.
///
/// `main_js` is the absolute URL of the glue; self-fetched locators are
/// resolved against it.
pub(super) fn encode(
    message: WorkerMessage<WebHandles>,
    main_js: &str,
) -> Result<JsValue, JsValue> {
    let object = Object::new();
    set(&object, TYPE, &tag(message.kind()))?;
    if let WorkerMessage::Init(init) = message {
        encode_init(&object, init, main_js)?;
    }
    Ok(object.into())
}

fn encode_init(
    object: &Object,
    init: PoolInitMessage<WebHandles>,
    main_js: &str,
) -> Result<(), JsValue> {
    match init.module {
        ModuleSource::DirectHandle(module) => {
            set(object, "module", &module)?;
            set(object, "mainJS", &JsValue::from_str(main_js))?;
        }
        ModuleSource::LocatorFetch(locator) => {
            let main_js = resolve_locator(&locator, main_js)?;
            set(object, "mainJS", &JsValue::from_str(&main_js))?;
        }
    }
    set(object, "memory", &init.memory)?;
    set(object, "receiver", &JsValue::from(init.task_receiver))?;
    set(object, "shareObject", &init.sync_object)?;
    set(object, "objSender", &JsValue::from(init.object_sender))?;
    Ok(())
}

/// Absolute form of `locator`. Workers started from a `blob:` URL have no
/// hierarchical base, so relative specifiers cannot be imported there.
pub(super) fn resolve_locator(locator: &str, base: &str) -> Result<String, JsValue> {
    Ok(Url::new_with_base(locator, base)?.href())
}

/// Classifies worker→launcher traffic. Init messages never flow this way, so
/// anything other than a ready signal is foreign.
pub(super) fn decode(data: &JsValue) -> WorkerMessage<WebHandles> {
    let tag = if data.is_object() {
        Reflect::get(data, &JsValue::from_str(TYPE))
            .ok()
            .and_then(|value| value.as_string())
    } else {
        None
    };
    match MessageKind::from_type_tag(tag.as_deref()) {
        MessageKind::Ready => WorkerMessage::Ready(ReadinessSignal),
        _ => WorkerMessage::Foreign(tag.unwrap_or_default()),
    }
}

fn tag(kind: MessageKind) -> JsValue {
    kind.type_tag().map(JsValue::from_str).unwrap_or(JsValue::UNDEFINED)
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), value)?;
    Ok(())
}
