//! UI Components

use leptos::prelude::*;

use crate::api::{ChatMessage, ChatSummary};

/// Message bubble component
///
/// Assistant messages are labelled with `assistant_name`, other messages
/// with their role.
#[component]
pub fn MessageBubble(
    message: ChatMessage,
    #[prop(into)] assistant_name: Signal<String>,
) -> impl IntoView {
    let class = format!("message message-{}", message.role);
    let role = message.role.clone();
    let speaker = move || {
        if role == "assistant" {
            assistant_name.get()
        } else {
            role.clone()
        }
    };
    let time = message.created.format("%H:%M").to_string();

    let body = if message.role == "tool" {
        view! { <p class="tool-summary">{message.tool_summary()}</p> }.into_any()
    } else {
        let reasoning = message.reasoning().map(|text| {
            let text = text.to_string();
            view! {
                <details class="chain-of-thought">
                    <summary>"Chain of Thought"</summary>
                    <pre>{text}</pre>
                </details>
            }
        });
        view! {
            {reasoning}
            <p class="content">{message.text().to_string()}</p>
        }
        .into_any()
    };

    view! {
        <div class=class>
            <span class="role">{speaker}</span>
            <span class="time">{time}</span>
            {body}
        </div>
    }
}

/// Sidebar entry
#[component]
pub fn ChatListItem(
    chat: ChatSummary,
    #[prop(into)] active: Signal<bool>,
    on_select: Callback<ChatSummary>,
) -> impl IntoView {
    let title = chat.title.clone();
    let model = chat.model.clone();

    view! {
        <li
            class="chat-item"
            class:active=move || active.get()
            on:click=move |_| on_select.run(chat.clone())
        >
            <span class="chat-item-title">{title}</span>
            <span class="chat-item-model">{model}</span>
        </li>
    }
}

/// Editable title of the open chat; commits on change
#[component]
pub fn ChatTitle(
    #[prop(into)] title: Signal<String>,
    #[prop(into)] disabled: Signal<bool>,
    on_rename: Callback<String>,
) -> impl IntoView {
    view! {
        <input
            class="chat-title"
            type="text"
            prop:value=move || title.get()
            disabled=move || disabled.get()
            on:change=move |ev| on_rename.run(event_target_value(&ev))
        />
    }
}
