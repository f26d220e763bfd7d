//! Streaming prompt socket

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use crate::api::{self, PromptPayload, StreamEvent};

/// One WebSocket per prompt; dropped sockets detach their handlers
pub struct PromptSocket {
    socket: WebSocket,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

impl PromptSocket {
    pub fn open(
        payload: &PromptPayload,
        on_event: impl FnMut(StreamEvent) + 'static,
    ) -> Result<Self, String> {
        let body = serde_json::to_string(payload).map_err(|e| e.to_string())?;
        let socket = WebSocket::new(&api::websocket_url("/api/chat/stream"))
            .map_err(|e| format!("Could not open stream: {:?}", e))?;

        let on_event = Rc::new(RefCell::new(on_event));
        let finished = Rc::new(Cell::new(false));

        let sender = socket.clone();
        let on_open = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            if let Err(e) = sender.send_with_str(&body) {
                web_sys::console::error_1(&e);
            }
        });

        let on_message = {
            let on_event = on_event.clone();
            let finished = finished.clone();
            let socket = socket.clone();
            Closure::<dyn FnMut(MessageEvent)>::new(move |ev: MessageEvent| {
                let Some(text) = ev.data().as_string() else {
                    return;
                };
                let event = match serde_json::from_str::<StreamEvent>(&text) {
                    Ok(event) => event,
                    Err(e) => StreamEvent::Error {
                        error: format!("Unreadable server message: {}", e),
                        code: String::new(),
                        retryable: false,
                    },
                };
                let last = matches!(event, StreamEvent::Done { .. } | StreamEvent::Error { .. });
                if last {
                    finished.set(true);
                }
                (on_event.borrow_mut())(event);
                if last {
                    let _ = socket.close();
                }
            })
        };

        let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |_: CloseEvent| {
            if !finished.replace(true) {
                (on_event.borrow_mut())(StreamEvent::Error {
                    error: "Connection to the server was lost".into(),
                    code: String::new(),
                    retryable: true,
                });
            }
        });

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(Self {
            socket,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
        })
    }
}

impl Drop for PromptSocket {
    fn drop(&mut self) {
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onclose(None);
        let _ = self.socket.close();
    }
}
