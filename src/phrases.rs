//! Prompt texts and matched reply phrases
//!
//! Every user-visible string the form sends, and every phrase it listens for,
//! comes from a [`Phrases`] bundle selected by locale at startup.

use std::fmt;
use std::str::FromStr;

/// Supported interface languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    Russian,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::English),
            "ru" | "russian" => Ok(Locale::Russian),
            other => Err(format!("unsupported locale '{other}' (expected 'en' or 'ru')")),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::English => f.write_str("en"),
            Locale::Russian => f.write_str("ru"),
        }
    }
}

/// Localized texts for one deployment
#[derive(Debug, PartialEq, Eq)]
pub struct Phrases {
    pub greeting: &'static str,
    pub ask_positions: &'static str,
    pub ask_resume: &'static str,
    pub ask_contacts: &'static str,
    pub ask_consent: &'static str,
    /// Consent keyboard buttons, also the accepted replies
    pub consent_yes: &'static str,
    pub consent_no: &'static str,
    /// Shown after the applicant declines consent
    pub consent_refused: &'static str,
    pub grant_consent: &'static str,
    pub delete_data: &'static str,
    pub data_deleted: &'static str,
    pub acknowledgment: &'static str,
    /// Written in place of a résumé link when none could be produced
    pub resume_placeholder: &'static str,
    pub summary_title: &'static str,
    pub summary_full_name: &'static str,
    pub summary_positions: &'static str,
    pub summary_contacts: &'static str,
    pub summary_resume: &'static str,
    pub summary_time: &'static str,
    pub summary_consent: &'static str,
    /// Column titles of the local submission log
    pub sheet_header: [&'static str; 5],
    /// Worksheet used when none is configured
    pub default_worksheet: &'static str,
    /// Whether the local log starts with a UTF-8 byte order mark
    pub log_byte_order_mark: bool,
}

static ENGLISH: Phrases = Phrases {
    greeting: "👋 Hello!\n\
        I am an automated bot that collects 📥 applications for the company's candidate reserve.\n\n\
        🤖 I can't hold a conversation, so unfortunately I won't be able to answer your questions.\n\
        But I will make sure your application doesn't get lost among the others.\n\n\
        📝 To begin, please enter your full name:",
    ask_positions: "Thank you! Now list your previous positions (comma separated):",
    ask_resume: "Would you like to attach your résumé? Send a document, or type any text to skip.",
    ask_contacts: "Please leave your contact details (ideally a phone number with WhatsApp):",
    ask_consent: "Do you consent to the processing and storage of your personal data?",
    consent_yes: "Yes",
    consent_no: "No",
    consent_refused: "Unfortunately, without consent to the processing and storage of personal data \
        we are not allowed to keep the information you provided. Please choose the next step.",
    grant_consent: "Grant consent",
    delete_data: "Delete my data",
    data_deleted: "Your data has not been saved. You may delete this chat manually if you wish. \
        Thank you for your interest either way, we hope to work together in the future!",
    acknowledgment: "Thank you! Your details have been added to our candidate reserve. \
        We will contact you as soon as a suitable vacancy opens.",
    resume_placeholder: "not provided",
    summary_title: "New applicant submission",
    summary_full_name: "Full name",
    summary_positions: "Positions",
    summary_contacts: "Contacts",
    summary_resume: "Résumé",
    summary_time: "Time",
    summary_consent: "Consent received",
    sheet_header: ["Time", "Full name", "Positions", "Contacts", "Résumé (link)"],
    default_worksheet: "Sheet1",
    log_byte_order_mark: false,
};

static RUSSIAN: Phrases = Phrases {
    greeting: "👋 Здравствуйте!\n\
        Я автоматический бот, предназначенный для 📥 сбора резерва соискателей в компанию.\n\n\
        🤖 Я не умею вести диалог, поэтому, к сожалению, не смогу ответить на Ваши вопросы.\n\
        Но обязательно помогу Вашей кандидатуре не потеряться в потоке других резюме.\n\n\
        📝 Для этого, пожалуйста, введите Ваше ФИО:",
    ask_positions: "Спасибо! Теперь укажите предыдущие должности (через запятую):",
    ask_resume: "Хотите прикрепить файл с резюме? Пришлите документ или напишите любой текст, чтобы пропустить.",
    ask_contacts: "Оставьте контактную информацию для связи (оптимально — телефон с привязанным WhatsApp):",
    ask_consent: "Вы даёте согласие на обработку и хранение персональных данных?",
    consent_yes: "Да",
    consent_no: "Нет",
    consent_refused: "К сожалению, по закону без согласия на обработку и хранение персональных данных \
        мы не сможем продолжить работу с предоставленной Вами информацией. Пожалуйста, выберите следующий шаг.",
    grant_consent: "Даю согласие",
    delete_data: "Удалите мои данные",
    data_deleted: "Ваши данные не были сохранены. Вы можете вручную удалить переписку, если желаете. \
        Мы в любом случае благодарны за Ваш интерес и надеемся посотрудничать в будущем!",
    acknowledgment: "Спасибо! Ваши данные успешно добавлены в резерв. \
        Мы свяжемся, как только появится подходящая для Вас вакансия.",
    resume_placeholder: "не предоставлено",
    summary_title: "Новая заявка от соискателя",
    summary_full_name: "ФИО",
    summary_positions: "Должности",
    summary_contacts: "Контакты",
    summary_resume: "Резюме",
    summary_time: "Время",
    summary_consent: "Согласие получено",
    sheet_header: ["Время", "ФИО", "Должности", "Контакты", "Резюме (ссылка)"],
    default_worksheet: "Лист1",
    // Excel reads BOM-less UTF-8 as the legacy code page
    log_byte_order_mark: true,
};

impl Phrases {
    pub fn english() -> &'static Self {
        &ENGLISH
    }

    pub fn russian() -> &'static Self {
        &RUSSIAN
    }

    pub fn for_locale(locale: Locale) -> &'static Self {
        match locale {
            Locale::English => &ENGLISH,
            Locale::Russian => &RUSSIAN,
        }
    }

    /// Case-insensitive exact match of a reply against an expected phrase
    pub fn matches(expected: &str, input: &str) -> bool {
        input.trim().to_lowercase() == expected.to_lowercase()
    }
}
