//! Spoken prompt text per language.

use crate::error::Feature;
use crate::session::Language;

pub(crate) fn language_menu() -> &'static str {
    "Welcome to Vidya Vani, your AI powered study helpline. For English, press 1. हिंदी के लिए 2 दबाएं।"
}

pub(crate) fn main_menu(lang: Language) -> &'static str {
    match lang {
        Language::English => {
            "Press 1 to ask a question. Press 2 to stop recording. Press 3 to hear the answer. \
             Press 4 for a summary of your last questions on a subject. Press 5 to hear this menu again. \
             Press 9 to end the call."
        }
        Language::Hindi => {
            "प्रश्न पूछने के लिए 1 दबाएं। रिकॉर्डिंग रोकने के लिए 2 दबाएं। उत्तर सुनने के लिए 3 दबाएं। \
             किसी विषय का सारांश सुनने के लिए 4 दबाएं। यह मेनू दोबारा सुनने के लिए 5 दबाएं। \
             कॉल समाप्त करने के लिए 9 दबाएं।"
        }
    }
}

pub(crate) fn ask_question(lang: Language) -> &'static str {
    match lang {
        Language::English => "Please ask your question after the beep. Press 2 when you are done.",
        Language::Hindi => "बीप के बाद अपना प्रश्न पूछें। पूरा होने पर 2 दबाएं।",
    }
}

pub(crate) fn question_received(lang: Language) -> &'static str {
    match lang {
        Language::English => "Thank you. Your question is being processed.",
        Language::Hindi => "धन्यवाद। आपके प्रश्न पर काम हो रहा है।",
    }
}

pub(crate) fn answer_prompt(lang: Language) -> &'static str {
    match lang {
        Language::English => "Press 3 to hear the answer.",
        Language::Hindi => "उत्तर सुनने के लिए 3 दबाएं।",
    }
}

pub(crate) fn still_processing(lang: Language) -> &'static str {
    match lang {
        Language::English => "Your question is still being processed. Please wait a moment and press 3 again.",
        Language::Hindi => "आपका प्रश्न अभी भी प्रोसेस हो रहा है। कृपया थोड़ी देर बाद फिर से 3 दबाएं।",
    }
}

pub(crate) fn nothing_recording(lang: Language) -> &'static str {
    match lang {
        Language::English => "Nothing is being recorded right now.",
        Language::Hindi => "अभी कुछ भी रिकॉर्ड नहीं हो रहा है।",
    }
}

pub(crate) fn no_question(lang: Language) -> &'static str {
    match lang {
        Language::English => "No question found. Please press 1 to ask a question first.",
        Language::Hindi => "कोई प्रश्न नहीं मिला। पहले प्रश्न पूछने के लिए 1 दबाएं।",
    }
}

pub(crate) fn invalid_option(lang: Language) -> &'static str {
    match lang {
        Language::English => "Sorry, that is not a valid option.",
        Language::Hindi => "क्षमा करें, यह मान्य विकल्प नहीं है।",
    }
}

pub(crate) fn here_is_answer(lang: Language) -> &'static str {
    match lang {
        Language::English => "Here is your answer.",
        Language::Hindi => "यह रहा आपका उत्तर।",
    }
}

pub(crate) fn after_answer(lang: Language) -> &'static str {
    match lang {
        Language::English => "Press 1 to ask another question, press 3 to hear the answer again, or press 9 to end the call.",
        Language::Hindi => "नया प्रश्न पूछने के लिए 1, उत्तर दोबारा सुनने के लिए 3, या कॉल समाप्त करने के लिए 9 दबाएं।",
    }
}

pub(crate) fn ask_subject(lang: Language) -> &'static str {
    match lang {
        Language::English => "Please tell me the subject you want summarized, then press the hash key.",
        Language::Hindi => "कृपया वह विषय बताएं जिसका सारांश चाहिए, फिर हैश की दबाएं।",
    }
}

pub(crate) fn subject_not_heard(lang: Language) -> &'static str {
    match lang {
        Language::English => "Sorry, I did not catch the subject.",
        Language::Hindi => "क्षमा करें, मैं विषय समझ नहीं पाई।",
    }
}

pub(crate) fn no_history(lang: Language, subject: &str) -> String {
    match lang {
        Language::English => format!(
            "You have not asked any questions about {subject} yet. Please ask some questions first, then request a summary."
        ),
        Language::Hindi => format!(
            "आपने अभी तक {subject} के बारे में कोई प्रश्न नहीं पूछा है। पहले कुछ प्रश्न पूछें, फिर सारांश मांगें।"
        ),
    }
}

pub(crate) fn summary_intro(lang: Language, subject: &str, count: usize) -> String {
    match lang {
        Language::English => format!(
            "Here is your learning summary for {subject}, based on your last {count} questions."
        ),
        Language::Hindi => format!("यह रहा {subject} का सारांश, आपके पिछले {count} प्रश्नों के आधार पर।"),
    }
}

pub(crate) fn after_summary(lang: Language) -> &'static str {
    match lang {
        Language::English => "Press 1 to ask another question, press 4 for another summary, or press 9 to end the call.",
        Language::Hindi => "नया प्रश्न पूछने के लिए 1, दूसरे सारांश के लिए 4, या कॉल समाप्त करने के लिए 9 दबाएं।",
    }
}

pub(crate) fn goodbye(lang: Language) -> &'static str {
    match lang {
        Language::English => "Thank you for calling Vidya Vani. Goodbye!",
        Language::Hindi => "विद्या वाणी को कॉल करने के लिए धन्यवाद। नमस्ते!",
    }
}

/// Apology spoken when a pipeline stage fails or is not configured.
pub(crate) fn apology(lang: Language, feature: Feature) -> &'static str {
    match (lang, feature) {
        (Language::English, Feature::Transcription) => {
            "Sorry, I could not understand the recording. Please try again."
        }
        (Language::English, Feature::Generation) => {
            "Sorry, the answer service is not available right now. Please try again later."
        }
        (Language::English, Feature::Synthesis) => "Sorry, I could not prepare the audio.",
        (Language::English, Feature::History) => {
            "Sorry, your question history is not available right now."
        }
        (Language::Hindi, Feature::Transcription) => {
            "क्षमा करें, मैं रिकॉर्डिंग समझ नहीं पाई। कृपया फिर से प्रयास करें।"
        }
        (Language::Hindi, Feature::Generation) => {
            "क्षमा करें, उत्तर सेवा अभी उपलब्ध नहीं है। कृपया बाद में प्रयास करें।"
        }
        (Language::Hindi, Feature::Synthesis) => "क्षमा करें, ऑडियो तैयार नहीं हो सका।",
        (Language::Hindi, Feature::History) => "क्षमा करें, आपका प्रश्न इतिहास अभी उपलब्ध नहीं है।",
    }
}
