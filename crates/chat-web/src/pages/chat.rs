//! Chat Page

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api::{self, ChatMessage, ChatSummary, ModelStatus, PromptPayload, StreamEvent};
use crate::components::{ChatListItem, ChatTitle, MessageBubble};
use crate::stream::PromptSocket;

fn upsert(chats: &mut Vec<ChatSummary>, chat: &ChatSummary) {
    match chats.iter_mut().find(|c| c.id == chat.id) {
        Some(existing) => *existing = chat.clone(),
        None => chats.push(chat.clone()),
    }
}

#[component]
pub fn ChatPage() -> impl IntoView {
    let (chats, set_chats) = signal(Vec::<ChatSummary>::new());
    let (models, set_models) = signal(Vec::<ModelStatus>::new());
    let (model, set_model) = signal(String::new());
    let (current, set_current) = signal(None::<ChatSummary>);
    let (messages, set_messages) = signal(Vec::<ChatMessage>::new());
    let (input, set_input) = signal(String::new());
    let (busy, set_busy) = signal(false);
    let (error, set_error) = signal(None::<String>);
    let socket = StoredValue::new_local(None::<PromptSocket>);

    // Initial load
    wasm_bindgen_futures::spawn_local(async move {
        match api::list_models().await {
            Ok(list) => {
                if let Some(preferred) = api::preferred_model(&list) {
                    set_model.set(preferred.id.clone());
                }
                set_models.set(list);
            }
            Err(e) => set_error.set(Some(e)),
        }
        match api::list_chats().await {
            Ok(list) => set_chats.set(list),
            Err(e) => set_error.set(Some(e)),
        }
    });

    let select_chat = Callback::new(move |chat: ChatSummary| {
        if busy.get_untracked() {
            return;
        }
        let id = chat.id.clone();
        set_current.set(Some(chat));
        set_messages.set(Vec::new());
        set_error.set(None);
        spawn_local(async move {
            match api::load_messages(&id).await {
                Ok(list) => set_messages.set(list),
                Err(e) => set_error.set(Some(e)),
            }
        });
    });

    let new_chat = move |_| {
        if busy.get_untracked() {
            return;
        }
        set_current.set(None);
        set_messages.set(Vec::new());
        set_error.set(None);
    };

    let rename = Callback::new(move |title: String| {
        let Some(chat) = current.get_untracked() else {
            return;
        };
        let title = title.trim().to_string();
        if title.is_empty() || title == chat.title {
            return;
        }
        spawn_local(async move {
            match api::rename_chat(&chat.id, &title).await {
                Ok(updated) => {
                    set_chats.update(|list| upsert(list, &updated));
                    set_current.set(Some(updated));
                }
                Err(e) => set_error.set(Some(e)),
            }
        });
    });

    let send = move || {
        let text = input.get_untracked();
        if text.trim().is_empty() || busy.get_untracked() {
            return;
        }

        let payload = PromptPayload {
            message: text,
            chat_id: current.get_untracked().map(|c| c.id),
            model: Some(model.get_untracked()).filter(|m| !m.is_empty()),
        };

        set_input.set(String::new());
        set_error.set(None);
        set_busy.set(true);

        let on_event = move |event: StreamEvent| match event {
            StreamEvent::Chat { chat } => {
                set_chats.update(|list| upsert(list, &chat));
                set_current.set(Some(chat));
            }
            StreamEvent::Snapshot { messages } => set_messages.set(messages),
            StreamEvent::Done { chat, .. } => {
                set_chats.update(|list| upsert(list, &chat));
                set_current.set(Some(chat));
                set_busy.set(false);
            }
            StreamEvent::Error { error, retryable, .. } => {
                let error = if retryable {
                    format!("{} Please try again.", error)
                } else {
                    error
                };
                set_error.set(Some(error));
                set_busy.set(false);
            }
        };

        match PromptSocket::open(&payload, on_event) {
            Ok(opened) => socket.set_value(Some(opened)),
            Err(e) => {
                set_error.set(Some(e));
                set_busy.set(false);
            }
        }
    };

    let title = Signal::derive(move || {
        current
            .get()
            .map_or_else(|| "New Chat".to_string(), |c| c.title)
    });
    let title_locked = Signal::derive(move || busy.get() || current.get().is_none());
    let assistant_name = Signal::derive(move || {
        let id = current.get().map_or_else(|| model.get(), |c| c.model);
        models
            .with(|list| list.iter().find(|m| m.id == id).map(|m| m.family.clone()))
            .unwrap_or_else(|| "assistant".to_string())
    });

    view! {
        <div class="chat">
            <aside class="sidebar">
                <button class="btn btn-primary new-chat" on:click=new_chat disabled=move || busy.get()>
                    "New Chat"
                </button>

                <Show when=move || models.with(|list| list.len() > 1)>
                    <div class="field">
                        <label>"Model"</label>
                        <select
                            disabled=move || busy.get() || current.get().is_some()
                            on:change=move |ev| set_model.set(event_target_value(&ev))
                        >
                            {move || {
                                let selected = model.get();
                                models
                                    .get()
                                    .into_iter()
                                    .map(|m| {
                                        let is_selected = m.id == selected;
                                        let label = if m.supports_tools {
                                            m.id.clone()
                                        } else {
                                            format!("{} (no tools)", m.id)
                                        };
                                        view! {
                                            <option value=m.id selected=is_selected>{label}</option>
                                        }
                                    })
                                    .collect_view()
                            }}
                        </select>
                    </div>
                </Show>

                <ul class="chat-list">
                    <For
                        each=move || chats.get()
                        key=|chat| format!("{}-{}", chat.id, chat.title)
                        children=move |chat| {
                            let id = chat.id.clone();
                            let active = Signal::derive(move || {
                                current.get().is_some_and(|c| c.id == id)
                            });
                            view! { <ChatListItem chat=chat active=active on_select=select_chat /> }
                        }
                    />
                </ul>
            </aside>

            <section class="chat-main">
                <header class="chat-header">
                    <ChatTitle title=title disabled=title_locked on_rename=rename />
                </header>

                <div class="messages">
                    <For
                        each=move || messages.get()
                        key=|msg| msg.render_key()
                        children=move |msg| view! { <MessageBubble message=msg assistant_name=assistant_name /> }
                    />
                    <Show when=move || busy.get()>
                        <div class="message loading">"..."</div>
                    </Show>
                    {move || error.get().map(|e| view! { <div class="message message-error">{e}</div> })}
                </div>

                <div class="input-area">
                    <textarea
                        placeholder="Ask anything..."
                        prop:value=move || input.get()
                        disabled=move || busy.get()
                        on:input=move |ev| set_input.set(event_target_value(&ev))
                        on:keydown=move |ev| {
                            if ev.key() == "Enter" && !ev.shift_key() {
                                ev.prevent_default();
                                send();
                            }
                        }
                    />
                    <button on:click=move |_| send() disabled=move || busy.get()>
                        {move || if busy.get() { "..." } else { "Send" }}
                    </button>
                </div>
            </section>
        </div>
    }
}
