use crate::core::types::ViewKind;
use crate::views::adapter::DisassemblyView;
use crate::views::{aot::AotView, bytecode::BytecodeView, jit::JitView};

pub fn view_for(kind: ViewKind) -> Box<dyn DisassemblyView> {
    match kind {
        ViewKind::Bytecode => Box::new(BytecodeView),
        ViewKind::Jit => Box::new(JitView),
        ViewKind::Aot => Box::new(AotView),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_its_view() {
        for kind in [ViewKind::Bytecode, ViewKind::Jit, ViewKind::Aot] {
            assert_eq!(view_for(kind).kind(), kind);
        }
    }
}
